use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a legacy client should be treated during migration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Bill,
    Rewrite,
    Flip,
    Dormant,
    DoNotBill,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Bill => "BILL",
            Disposition::Rewrite => "REWRITE",
            Disposition::Flip => "FLIP",
            Disposition::Dormant => "DORMANT",
            Disposition::DoNotBill => "DO_NOT_BILL",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Outcome of running one client through the rule chain.
///
/// Created once per classification call and never updated in place;
/// re-classifying a record produces a fresh result.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ClassificationResult {
    pub client_id: String,
    pub disposition: Disposition,
    /// 0-100.
    pub confidence: u8,
    pub reasoning: Vec<String>,
    pub risk_score: u8,
    pub risk_factors: Vec<String>,
    pub required_actions: Vec<String>,
    pub estimated_recovery: Option<Decimal>,
    pub priority: Priority,
    pub compliance_review_required: bool,
}
