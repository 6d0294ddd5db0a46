//! Historical transaction reprocessing.
//!
//! Three stages per record: validate, enrich, assess. Validation failures
//! fail the record outright; warnings only push it to review. Enrichment
//! lookups go through the injected provider port and are awaited together.

use chrono::{DateTime, Duration, Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::vault::recommend;
use crate::domain::ports::EnrichmentProviderRef;
use crate::domain::transaction::{
    EnrichmentPayload, ProcessedTransaction, ProcessingStatus, TransactionRecord,
    TransactionStatus, TransactionType, ValidationOutcome,
};
use crate::domain::vault::RiskAssessment;
use crate::error::Result;

const PLAUSIBLE_WINDOW_YEARS: i64 = 5;
const LARGE_AMOUNT: Decimal = dec!(5000);
const HIGH_RISK_REVIEW_SCORE: u8 = 70;

/// Response codes the legacy gateway used for soft declines that fraud
/// rings probe with.
const SUSPICIOUS_RESPONSE_CODES: &[&str] = &["220", "221", "300", "301", "320"];

pub struct TransactionProcessor {
    enrichment: EnrichmentProviderRef,
}

impl TransactionProcessor {
    pub fn new(enrichment: EnrichmentProviderRef) -> Self {
        Self { enrichment }
    }

    pub async fn process(&self, record: &TransactionRecord) -> Result<ProcessedTransaction> {
        self.process_at(record, Utc::now()).await
    }

    pub async fn process_at(
        &self,
        record: &TransactionRecord,
        now: DateTime<Utc>,
    ) -> Result<ProcessedTransaction> {
        let validation = validate(record, now);

        // Enrichment is skipped for records that already failed; nothing
        // downstream consumes their signals.
        let enrichment = if validation.is_valid() {
            Some(self.enrich(record).await?)
        } else {
            None
        };

        let risk = assess(record, &validation, enrichment.as_ref());

        let status = if !validation.is_valid() {
            ProcessingStatus::Failed
        } else if risk.score >= HIGH_RISK_REVIEW_SCORE || !validation.warnings.is_empty() {
            ProcessingStatus::NeedsReview
        } else {
            ProcessingStatus::Success
        };

        Ok(ProcessedTransaction {
            transaction_id: record.transaction_id.clone(),
            status,
            validation,
            enrichment,
            risk,
            processed_at: now,
        })
    }

    async fn enrich(&self, record: &TransactionRecord) -> Result<EnrichmentPayload> {
        // Independent network-bound lookups, awaited together.
        let (customer_risk, geographic_risk) = tokio::join!(
            self.enrichment.customer_risk(&record.customer_id),
            self.enrichment
                .geographic_risk(record.billing_country.as_deref()),
        );

        Ok(EnrichmentPayload {
            customer_risk: customer_risk?,
            geographic_risk: geographic_risk?,
            fraud_indicators: detect_fraud_indicators(record),
            chargeback_probability: chargeback_probability(record),
        })
    }
}

pub fn validate(record: &TransactionRecord, now: DateTime<Utc>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    if record.transaction_id.trim().is_empty() {
        outcome.errors.push("transaction id missing".into());
    }
    if record.customer_id.trim().is_empty() {
        outcome.errors.push("customer reference missing".into());
    }
    if record.currency.trim().is_empty() {
        outcome.errors.push("currency missing".into());
    }

    match record.transaction_date {
        None => outcome.errors.push("transaction date missing".into()),
        Some(date) => {
            let oldest = now - Duration::days(365 * PLAUSIBLE_WINDOW_YEARS);
            let newest = now + Duration::days(1);
            if date < oldest || date > newest {
                outcome
                    .errors
                    .push(format!("transaction date {date} outside plausible window"));
            }
        }
    }

    if record.amount.is_sign_negative() || record.amount.is_zero() {
        outcome
            .errors
            .push(format!("amount must be positive, got {}", record.amount));
    }

    if record.is_card_transaction() && record.card_last_four.as_deref().is_none_or(str::is_empty) {
        outcome
            .errors
            .push("card transaction missing card last four".into());
    }

    // Borderline status inconsistencies are warnings, not failures.
    if record.status == TransactionStatus::Approved && record.auth_code.is_none() {
        outcome
            .warnings
            .push("approved transaction without auth code".into());
    }
    if record.status == TransactionStatus::Declined
        && record.response_code.as_deref() == Some("100")
    {
        outcome
            .warnings
            .push("declined transaction carries success response code".into());
    }
    if record.status == TransactionStatus::Refunded
        && record.transaction_type != TransactionType::Refund
    {
        outcome
            .warnings
            .push("refunded status on non-refund transaction".into());
    }

    outcome
}

pub fn detect_fraud_indicators(record: &TransactionRecord) -> Vec<String> {
    let mut indicators = Vec::new();

    if record.amount >= LARGE_AMOUNT {
        indicators.push(format!("large amount {}", record.amount));
    }

    if let Some(date) = record.transaction_date {
        let hour = date.hour();
        if (1..5).contains(&hour) {
            indicators.push(format!("odd transaction hour {hour:02}:00 UTC"));
        }
    }

    if let Some(code) = record.response_code.as_deref()
        && SUSPICIOUS_RESPONSE_CODES.contains(&code)
    {
        indicators.push(format!("suspicious response code {code}"));
    }

    if record.avs_response.as_deref() == Some("N") && record.cvv_response.as_deref() == Some("N") {
        indicators.push("AVS and CVV both mismatched".into());
    }

    indicators
}

/// Rough per-transaction chargeback likelihood, 0.0-1.0.
pub fn chargeback_probability(record: &TransactionRecord) -> f64 {
    let mut p: f64 = 0.02;
    if record.status == TransactionStatus::Declined {
        p += 0.15;
    }
    if record.transaction_type == TransactionType::Chargeback {
        p += 0.40;
    }
    if record.amount >= Decimal::from(1000) {
        p += 0.05;
    }
    p.min(1.0)
}

fn assess(
    record: &TransactionRecord,
    validation: &ValidationOutcome,
    enrichment: Option<&EnrichmentPayload>,
) -> RiskAssessment {
    let mut score = 0.0;
    let mut factors = Vec::new();

    if !validation.is_valid() {
        score += 25.0;
        factors.push(format!("{} validation error(s)", validation.errors.len()));
    }

    if let Some(payload) = enrichment {
        score += f64::from(payload.customer_risk) * 0.35;
        if payload.customer_risk > 0 {
            factors.push(format!("customer history risk {}", payload.customer_risk));
        }
        score += f64::from(payload.geographic_risk) * 0.25;
        if payload.geographic_risk > 0 {
            factors.push(format!("geographic risk {}", payload.geographic_risk));
        }
        score += payload.fraud_indicators.len() as f64 * 10.0;
        factors.extend(payload.fraud_indicators.iter().cloned());
        score += payload.chargeback_probability * 40.0;
        if payload.chargeback_probability > 0.1 {
            factors.push(format!(
                "chargeback probability {:.0}%",
                payload.chargeback_probability * 100.0
            ));
        }
    }

    if record.amount >= Decimal::from(10_000) {
        score += 10.0;
        factors.push("very large amount".into());
    }

    let score = score.round().clamp(0.0, 100.0) as u8;
    RiskAssessment {
        score,
        factors,
        recommendation: recommend(score),
    }
}
