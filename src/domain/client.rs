use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Compliance flags that block billing outright, matched case-insensitively.
pub const HARD_COMPLIANCE_FLAGS: &[&str] =
    &["LEGAL_HOLD", "FRAUD_CONFIRMED", "REGULATORY_BLOCK", "DECEASED"];

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Suspended,
    Cancelled,
    Expired,
    None,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DisputeOutcome {
    Pending,
    Won,
    Lost,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DisputeRecord {
    pub opened_at: DateTime<Utc>,
    pub amount: Decimal,
    pub reason: String,
    pub outcome: DisputeOutcome,
}

/// A legacy billing client as handed over by the object store.
///
/// Immutable input to classification; the engines never mutate it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ClientRecord {
    pub client_id: String,
    pub legal_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub signup_date: Option<DateTime<Utc>>,
    pub last_activity_date: Option<DateTime<Utc>>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub last_payment_amount: Option<Decimal>,
    #[serde(default)]
    pub lifetime_value: Decimal,
    /// Length of the payment history, in months.
    #[serde(default)]
    pub payment_history_months: u32,
    #[serde(default)]
    pub has_payment_method: bool,
    pub payment_method_type: Option<String>,
    #[serde(default)]
    pub successful_payments: u32,
    #[serde(default)]
    pub failed_payments: u32,
    #[serde(default)]
    pub chargebacks: u32,
    #[serde(default)]
    pub disputes: Vec<DisputeRecord>,
    pub current_plan: Option<String>,
    pub legacy_plan: Option<String>,
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub fraud_indicators: Vec<String>,
    #[serde(default)]
    pub compliance_flags: Vec<String>,
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub tos_accepted: bool,
}

impl ClientRecord {
    /// Card-backed payment method with a concrete type on file.
    pub fn has_valid_payment_method(&self) -> bool {
        self.has_payment_method
            && self
                .payment_method_type
                .as_deref()
                .is_some_and(|t| !t.is_empty())
    }

    /// Age of the account in whole months relative to `now`, if known.
    pub fn account_age_months(&self, now: DateTime<Utc>) -> Option<u32> {
        let signup = self.signup_date?;
        if signup > now {
            return Some(0);
        }
        Some((now.signed_duration_since(signup).num_days() / 30) as u32)
    }

    pub fn pending_disputes(&self) -> usize {
        self.disputes
            .iter()
            .filter(|d| d.outcome == DisputeOutcome::Pending)
            .count()
    }

    pub fn has_hard_compliance_flag(&self) -> bool {
        self.compliance_flags.iter().any(|f| {
            HARD_COMPLIANCE_FLAGS
                .iter()
                .any(|h| f.eq_ignore_ascii_case(h))
        })
    }

    /// No billing history at all: never a success, never a failure.
    pub fn has_billing_history(&self) -> bool {
        self.successful_payments > 0 || self.failed_payments > 0
    }
}
