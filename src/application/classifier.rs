//! Status classification engine.
//!
//! Five terminal dispositions resolved by an explicit ordered rule table.
//! Rules are evaluated top to bottom and the first match wins; overlapping
//! conditions are resolved purely by position in the table, which is the
//! business priority. `DO_NOT_BILL` sits first and short-circuits
//! everything else.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::risk::{self, RiskScore};
use crate::domain::classification::{ClassificationResult, Disposition, Priority};
use crate::domain::client::{ClientRecord, SubscriptionStatus};

const RECENT_PAYMENT_DAYS: i64 = 45;
const RECENT_ACTIVITY_DAYS: i64 = 90;
const BILL_LTV_THRESHOLD: Decimal = dec!(1000);
const FLIP_LTV_THRESHOLD: Decimal = dec!(500);

/// Plans retired without a direct successor; clients on them need a
/// rewritten agreement.
const DISCONTINUED_PLANS: &[&str] = &[
    "legacy_starter",
    "legacy_pro",
    "grandfathered_unlimited",
    "partner_beta",
];

const CARD_METHOD_TYPES: &[&str] = &["card", "credit_card", "visa", "mastercard", "amex", "discover"];

pub struct RuleContext<'a> {
    pub record: &'a ClientRecord,
    pub risk: &'a RiskScore,
    pub now: DateTime<Utc>,
}

/// One entry in the ordered rule chain.
pub struct Rule {
    pub disposition: Disposition,
    pub matches: fn(&RuleContext) -> bool,
    build: fn(&RuleContext) -> ClassificationResult,
}

pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self { rules: rule_table() }
    }

    /// Classifies a single client. Pure: identical record plus clock
    /// always yields the same result.
    pub fn classify(&self, record: &ClientRecord) -> ClassificationResult {
        self.classify_at(record, Utc::now())
    }

    pub fn classify_at(&self, record: &ClientRecord, now: DateTime<Utc>) -> ClassificationResult {
        let risk = risk::score_client(record, now);
        let ctx = RuleContext {
            record,
            risk: &risk,
            now,
        };
        for rule in &self.rules {
            if (rule.matches)(&ctx) {
                return (rule.build)(&ctx);
            }
        }
        // The table ends in a catch-all, so this is unreachable; keep the
        // dormant outcome as a belt anyway.
        build_dormant(&ctx)
    }

    /// The ordered dispositions, exposed for audit and per-rule testing.
    pub fn rule_order(&self) -> Vec<Disposition> {
        self.rules.iter().map(|r| r.disposition).collect()
    }
}

fn rule_table() -> Vec<Rule> {
    vec![
        Rule {
            disposition: Disposition::DoNotBill,
            matches: matches_do_not_bill,
            build: build_do_not_bill,
        },
        Rule {
            disposition: Disposition::Bill,
            matches: matches_bill,
            build: build_bill,
        },
        Rule {
            disposition: Disposition::Rewrite,
            matches: matches_rewrite,
            build: build_rewrite,
        },
        Rule {
            disposition: Disposition::Flip,
            matches: matches_flip,
            build: build_flip,
        },
        Rule {
            disposition: Disposition::Dormant,
            matches: |_| true,
            build: build_dormant,
        },
    ]
}

// ---- predicates ----

fn matches_do_not_bill(ctx: &RuleContext) -> bool {
    let r = ctx.record;
    r.has_hard_compliance_flag()
        || r.chargebacks >= 3
        || (ctx.risk.score > 80 && !r.compliance_flags.is_empty())
        || (!r.has_billing_history() && !r.tos_accepted)
}

fn matches_bill(ctx: &RuleContext) -> bool {
    ctx.record.has_valid_payment_method()
        && (has_recent_successful_payment(ctx)
            || has_healthy_active_subscription(ctx)
            || has_high_value_recent_activity(ctx))
}

fn matches_rewrite(ctx: &RuleContext) -> bool {
    let r = ctx.record;
    let unmapped_legacy = r.legacy_plan.is_some() && r.current_plan.is_none();
    let discontinued = r
        .current_plan
        .as_deref()
        .is_some_and(|p| DISCONTINUED_PLANS.iter().any(|d| p.eq_ignore_ascii_case(d)));
    let suspended_payer = r.has_valid_payment_method()
        && r.successful_payments > 3
        && r.chargebacks == 0
        && r.subscription_status == SubscriptionStatus::Suspended;
    unmapped_legacy || discontinued || suspended_payer
}

fn matches_flip(ctx: &RuleContext) -> bool {
    let r = ctx.record;
    let clean_card = r.has_valid_payment_method()
        && is_card_method(r)
        && r.chargebacks == 0
        && ctx.risk.score < 30;
    let valuable = r.lifetime_value > FLIP_LTV_THRESHOLD
        && r.successful_payments > r.failed_payments
        && r.subscription_status != SubscriptionStatus::Cancelled;
    clean_card || valuable
}

fn has_recent_successful_payment(ctx: &RuleContext) -> bool {
    let r = ctx.record;
    let recent = r
        .last_payment_date
        .is_some_and(|d| ctx.now.signed_duration_since(d).num_days() <= RECENT_PAYMENT_DAYS);
    recent && r.last_payment_amount.is_some_and(|a| a > Decimal::ZERO)
}

fn has_healthy_active_subscription(ctx: &RuleContext) -> bool {
    let r = ctx.record;
    r.subscription_status == SubscriptionStatus::Active
        && r.successful_payments > r.failed_payments
        && r.chargebacks == 0
        && ctx.risk.score < 40
}

fn has_high_value_recent_activity(ctx: &RuleContext) -> bool {
    let r = ctx.record;
    let active = r
        .last_activity_date
        .is_some_and(|d| ctx.now.signed_duration_since(d).num_days() <= RECENT_ACTIVITY_DAYS);
    r.lifetime_value > BILL_LTV_THRESHOLD && active && ctx.risk.score < 50
}

fn is_card_method(record: &ClientRecord) -> bool {
    record
        .payment_method_type
        .as_deref()
        .is_some_and(|t| CARD_METHOD_TYPES.iter().any(|c| t.eq_ignore_ascii_case(c)))
}

// ---- outcome builders ----

fn base_result(ctx: &RuleContext, disposition: Disposition) -> ClassificationResult {
    ClassificationResult {
        client_id: ctx.record.client_id.clone(),
        disposition,
        confidence: 0,
        reasoning: Vec::new(),
        risk_score: ctx.risk.score,
        risk_factors: ctx.risk.factors.clone(),
        required_actions: Vec::new(),
        estimated_recovery: None,
        priority: Priority::Low,
        compliance_review_required: !ctx.record.compliance_flags.is_empty(),
    }
}

/// Lifetime value spread over the payment history, in months (min 1).
fn estimated_monthly_value(record: &ClientRecord) -> Decimal {
    let months = Decimal::from(record.payment_history_months.max(1));
    record.lifetime_value / months
}

fn discounted_recovery(record: &ClientRecord, risk: u8) -> Decimal {
    estimated_monthly_value(record) * (Decimal::from(100u32 - u32::from(risk.min(100))) / dec!(100))
}

fn build_do_not_bill(ctx: &RuleContext) -> ClassificationResult {
    let r = ctx.record;
    let mut out = base_result(ctx, Disposition::DoNotBill);
    out.confidence = 95;
    out.priority = Priority::High;
    if r.has_hard_compliance_flag() {
        out.reasoning
            .push("Hard compliance flag on file blocks all billing".into());
    }
    if r.chargebacks >= 3 {
        out.reasoning
            .push(format!("{} chargebacks exceed the hard limit of 3", r.chargebacks));
    }
    if ctx.risk.score > 80 && !r.compliance_flags.is_empty() {
        out.reasoning.push(format!(
            "Risk score {} above 80 combined with compliance flags",
            ctx.risk.score
        ));
    }
    if !r.has_billing_history() && !r.tos_accepted {
        out.reasoning
            .push("No billing history and no terms-of-service acceptance on file".into());
    }
    out.required_actions = vec![
        "Suppress all billing attempts".into(),
        "Escalate to compliance review queue".into(),
        "Archive stored payment credentials".into(),
    ];
    out
}

fn build_bill(ctx: &RuleContext) -> ClassificationResult {
    let mut out = base_result(ctx, Disposition::Bill);
    out.priority = Priority::High;
    if has_recent_successful_payment(ctx) {
        out.confidence = 92;
        out.reasoning
            .push("Successful payment within the last 45 days".into());
    } else if has_healthy_active_subscription(ctx) {
        out.confidence = 88;
        out.reasoning
            .push("Active subscription with a healthy payment record".into());
    } else {
        out.confidence = 85;
        out.reasoning
            .push("High lifetime value with recent account activity".into());
    }
    out.reasoning.push("Valid payment method on file".into());
    out.estimated_recovery = Some(estimated_monthly_value(ctx.record));
    out.required_actions = vec![
        "Verify payment method token before first charge".into(),
        "Schedule first billing cycle".into(),
        "Send billing resumption notice".into(),
    ];
    out
}

fn build_rewrite(ctx: &RuleContext) -> ClassificationResult {
    let r = ctx.record;
    let mut out = base_result(ctx, Disposition::Rewrite);
    out.confidence = 80;
    out.priority = Priority::Medium;
    if r.legacy_plan.is_some() && r.current_plan.is_none() {
        out.reasoning
            .push("Legacy plan has no mapping to the current catalog".into());
    }
    if let Some(plan) = r.current_plan.as_deref()
        && DISCONTINUED_PLANS.iter().any(|d| plan.eq_ignore_ascii_case(d))
    {
        out.reasoning
            .push(format!("Current plan '{plan}' is discontinued"));
    }
    if r.subscription_status == SubscriptionStatus::Suspended {
        out.reasoning
            .push("Proven payer with a suspended subscription".into());
    }
    out.estimated_recovery = Some(discounted_recovery(r, ctx.risk.score));
    out.required_actions = vec![
        "Map legacy plan to current catalog".into(),
        "Draft replacement subscription terms".into(),
        "Obtain client acceptance before billing".into(),
    ];
    out
}

fn build_flip(ctx: &RuleContext) -> ClassificationResult {
    let mut out = base_result(ctx, Disposition::Flip);
    out.confidence = 75;
    out.priority = Priority::Medium;
    out.reasoning
        .push("Clean payment profile eligible for direct cut-over to the new billing engine".into());
    out.estimated_recovery = Some(discounted_recovery(ctx.record, ctx.risk.score));
    out.required_actions = vec![
        "Switch account to the new billing engine".into(),
        "Confirm card token migrated successfully".into(),
        "Monitor the first billing cycle".into(),
    ];
    out
}

fn build_dormant(ctx: &RuleContext) -> ClassificationResult {
    let mut out = base_result(ctx, Disposition::Dormant);
    out.confidence = 60;
    out.priority = Priority::Low;
    out.reasoning
        .push("No billing, rewrite, or flip criteria matched".into());
    out.required_actions = vec![
        "Queue for re-engagement campaign".into(),
        "Re-evaluate after 90 days".into(),
    ];
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn client() -> ClientRecord {
        ClientRecord {
            client_id: "cl-42".into(),
            legal_name: "Test Co".into(),
            email: Some("billing@test.co".into()),
            phone: None,
            signup_date: Some(Utc::now() - Duration::days(800)),
            last_activity_date: None,
            last_payment_date: None,
            last_payment_amount: None,
            lifetime_value: dec!(0),
            payment_history_months: 12,
            has_payment_method: false,
            payment_method_type: None,
            successful_payments: 0,
            failed_payments: 0,
            chargebacks: 0,
            disputes: vec![],
            current_plan: None,
            legacy_plan: None,
            subscription_status: SubscriptionStatus::None,
            fraud_indicators: vec![],
            compliance_flags: vec![],
            jurisdiction: None,
            tos_accepted: true,
        }
    }

    #[test]
    fn rule_order_is_fixed() {
        let classifier = Classifier::new();
        assert_eq!(
            classifier.rule_order(),
            vec![
                Disposition::DoNotBill,
                Disposition::Bill,
                Disposition::Rewrite,
                Disposition::Flip,
                Disposition::Dormant,
            ]
        );
    }

    #[test]
    fn three_chargebacks_always_block_billing() {
        let mut record = client();
        record.chargebacks = 3;
        // Make the record otherwise perfect for BILL.
        record.has_payment_method = true;
        record.payment_method_type = Some("card".into());
        record.last_payment_date = Some(Utc::now() - Duration::days(5));
        record.last_payment_amount = Some(dec!(49.99));

        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::DoNotBill);
    }

    #[test]
    fn confirmed_fraud_flag_forces_compliance_review() {
        let mut record = client();
        record.compliance_flags = vec!["FRAUD_CONFIRMED".into()];
        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::DoNotBill);
        assert!(result.compliance_review_required);
    }

    #[test]
    fn recent_payer_bills_with_high_confidence() {
        let mut record = client();
        record.has_payment_method = true;
        record.payment_method_type = Some("card".into());
        record.last_payment_date = Some(Utc::now() - Duration::days(10));
        record.last_payment_amount = Some(dec!(29.00));
        record.subscription_status = SubscriptionStatus::Active;
        record.successful_payments = 12;

        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::Bill);
        assert!(result.confidence >= 85);
        assert!(result.estimated_recovery.is_some());
    }

    #[test]
    fn unmapped_legacy_plan_goes_to_rewrite() {
        let mut record = client();
        record.legacy_plan = Some("old_gold".into());
        record.current_plan = None;
        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::Rewrite);
    }

    #[test]
    fn discontinued_plan_goes_to_rewrite() {
        let mut record = client();
        record.current_plan = Some("LEGACY_PRO".into());
        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::Rewrite);
    }

    #[test]
    fn clean_card_flips() {
        let mut record = client();
        record.has_payment_method = true;
        record.payment_method_type = Some("visa".into());
        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::Flip);
    }

    #[test]
    fn bill_outranks_flip_on_overlap() {
        // Satisfies the BILL active-subscription arm and the FLIP clean-card
        // arm; table order resolves to BILL.
        let mut record = client();
        record.has_payment_method = true;
        record.payment_method_type = Some("card".into());
        record.subscription_status = SubscriptionStatus::Active;
        record.successful_payments = 10;

        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::Bill);
    }

    #[test]
    fn nothing_matching_falls_back_to_dormant() {
        let result = Classifier::new().classify(&client());
        assert_eq!(result.disposition, Disposition::Dormant);
        assert_eq!(result.priority, Priority::Low);
    }

    #[test]
    fn classification_is_deterministic() {
        let mut record = client();
        record.has_payment_method = true;
        record.payment_method_type = Some("card".into());
        let classifier = Classifier::new();
        let now = Utc::now();
        assert_eq!(
            classifier.classify_at(&record, now),
            classifier.classify_at(&record, now)
        );
    }

    #[test]
    fn recovery_discounted_by_risk() {
        let mut record = client();
        record.lifetime_value = dec!(1200);
        record.payment_history_months = 12;
        record.legacy_plan = Some("old".into());
        record.failed_payments = 5;
        record.successful_payments = 5;

        let result = Classifier::new().classify(&record);
        assert_eq!(result.disposition, Disposition::Rewrite);
        // 1200/12 = 100 monthly, discounted by 15% failure-ratio risk.
        assert_eq!(result.estimated_recovery, Some(dec!(85)));
    }
}
