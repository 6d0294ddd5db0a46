use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::vault::{Recommendation, RiskAssessment};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Auth,
    Capture,
    Void,
    Refund,
    Chargeback,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Approved,
    Declined,
    Error,
    Pending,
    Voided,
    Refunded,
}

/// A historical gateway transaction pulled from the legacy logs.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub legacy_transaction_id: Option<String>,
    pub customer_id: String,
    pub vault_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub transaction_date: Option<DateTime<Utc>>,
    pub response_code: Option<String>,
    pub auth_code: Option<String>,
    pub avs_response: Option<String>,
    pub cvv_response: Option<String>,
    pub billing_country: Option<String>,
    pub card_last_four: Option<String>,
    pub processor_id: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

impl TransactionRecord {
    pub fn is_card_transaction(&self) -> bool {
        matches!(
            self.transaction_type,
            TransactionType::Sale | TransactionType::Auth | TransactionType::Capture
        )
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Success,
    Failed,
    NeedsReview,
}

/// Validation result for one transaction. Errors fail the record;
/// warnings only push it toward review.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Risk signals attached to a transaction during enrichment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct EnrichmentPayload {
    /// 0-100 risk carried by the customer's history.
    pub customer_risk: u8,
    /// 0-100 risk of the billing country.
    pub geographic_risk: u8,
    pub fraud_indicators: Vec<String>,
    /// 0.0-1.0 estimated probability of a future chargeback.
    pub chargeback_probability: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ProcessedTransaction {
    pub transaction_id: String,
    pub status: ProcessingStatus,
    pub validation: ValidationOutcome,
    pub enrichment: Option<EnrichmentPayload>,
    pub risk: RiskAssessment,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedTransaction {
    pub fn needs_review(&self) -> bool {
        self.status == ProcessingStatus::NeedsReview
            || self.risk.recommendation == Recommendation::Review
    }
}
