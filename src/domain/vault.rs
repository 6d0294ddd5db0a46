use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum VaultStatus {
    Active,
    Disabled,
    Expired,
}

/// A stored payment method in the legacy vault, as exported by the old
/// gateway. Card data is masked; the raw PAN never enters this system.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LegacyVaultRecord {
    pub legacy_vault_id: String,
    pub customer_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Masked card number, e.g. `411111******1111`.
    pub cc_number_masked: String,
    /// Expiry as `MMYY`.
    pub cc_exp: String,
    pub card_type: Option<String>,
    pub status: VaultStatus,
    #[serde(default)]
    pub chargebacks: u32,
    pub signup_date: Option<DateTime<Utc>>,
    /// Free-text operator notes; scanned for risk language.
    pub notes: Option<String>,
    pub migration_batch_id: Option<String>,
}

impl LegacyVaultRecord {
    /// Last four digits of the masked number, if present.
    pub fn last_four(&self) -> Option<&str> {
        let digits_from_end: Vec<usize> = self
            .cc_number_masked
            .char_indices()
            .filter(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i)
            .collect();
        if digits_from_end.len() < 4 {
            return None;
        }
        let start = digits_from_end[digits_from_end.len() - 4];
        // Only usable if the last four digits are contiguous.
        let tail = &self.cc_number_masked[start..];
        if tail.chars().all(|c| c.is_ascii_digit()) && tail.len() == 4 {
            Some(tail)
        } else {
            None
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingStatus {
    Mapped,
    Failed,
    NeedsValidation,
    Duplicate,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RiskAssessment {
    /// 0-100.
    pub score: u8,
    pub factors: Vec<String>,
    pub recommendation: Recommendation,
}

/// The result of migrating one legacy vault entry to the new vault.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TokenMapping {
    pub legacy_vault_id: String,
    pub new_vault_id: Option<String>,
    pub customer_id: String,
    pub status: MappingStatus,
    pub validation_errors: Vec<String>,
    pub risk: RiskAssessment,
    pub created_at: DateTime<Utc>,
}
