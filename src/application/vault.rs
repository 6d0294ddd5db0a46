//! Legacy vault migration.
//!
//! Per-record pipeline: validate the stored payment method, check the
//! run-scoped duplicate fingerprint, assess risk, mint a new vault id, and
//! resolve the mapping status. Duplicate detection is advisory and only
//! spans the current run; it is not a cross-batch uniqueness constraint.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::domain::vault::{
    LegacyVaultRecord, MappingStatus, Recommendation, RiskAssessment, TokenMapping, VaultStatus,
};

const CHARGEBACK_WEIGHT: u32 = 25;
const INVALID_METHOD_WEIGHT: u32 = 20;
const DISABLED_STATUS_WEIGHT: u32 = 15;
const EXPIRED_STATUS_WEIGHT: u32 = 10;
const MISSING_CONTACT_WEIGHT: u32 = 5;
const NOTE_KEYWORD_WEIGHT: u32 = 10;

const APPROVE_BELOW: u8 = 50;
const REVIEW_BELOW: u8 = 80;

/// Free-text note language that raises risk.
const RISK_KEYWORDS: &[&str] = &["fraud", "stolen", "chargeback", "dispute", "collection"];

/// Migrates one batch worth of legacy vault records. Holds the fingerprint
/// set for duplicate detection, so one instance per run.
pub struct VaultMigrator {
    seen_fingerprints: HashSet<String>,
}

impl Default for VaultMigrator {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultMigrator {
    pub fn new() -> Self {
        Self {
            seen_fingerprints: HashSet::new(),
        }
    }

    pub fn migrate(&mut self, record: &LegacyVaultRecord) -> TokenMapping {
        self.migrate_at(record, Utc::now())
    }

    pub fn migrate_at(&mut self, record: &LegacyVaultRecord, now: DateTime<Utc>) -> TokenMapping {
        let validation_errors = validate_payment_method(record, now);

        let fingerprint = fingerprint(record);
        if !self.seen_fingerprints.insert(fingerprint) {
            // Same email plus card already processed in this run.
            return TokenMapping {
                legacy_vault_id: record.legacy_vault_id.clone(),
                new_vault_id: None,
                customer_id: record.customer_id.clone(),
                status: MappingStatus::Duplicate,
                validation_errors,
                risk: RiskAssessment {
                    score: 100,
                    factors: vec!["duplicate payment method within batch".into()],
                    recommendation: Recommendation::Reject,
                },
                created_at: now,
            };
        }

        let risk = assess_risk(record, &validation_errors, now);

        let status = if !validation_errors.is_empty() {
            MappingStatus::Failed
        } else if risk.recommendation == Recommendation::Review {
            MappingStatus::NeedsValidation
        } else {
            MappingStatus::Mapped
        };

        let new_vault_id = match status {
            MappingStatus::Failed => None,
            _ => Some(new_vault_id(now)),
        };

        TokenMapping {
            legacy_vault_id: record.legacy_vault_id.clone(),
            new_vault_id,
            customer_id: record.customer_id.clone(),
            status,
            validation_errors,
            risk,
            created_at: now,
        }
    }
}

/// Email + last-four key for best-effort duplicate detection. Falls back
/// to the whole masked number when fewer than four digits survive masking.
fn fingerprint(record: &LegacyVaultRecord) -> String {
    let email = record
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let card = record
        .last_four()
        .map(str::to_string)
        .unwrap_or_else(|| record.cc_number_masked.clone());
    format!("{email}|{card}")
}

pub fn validate_payment_method(record: &LegacyVaultRecord, now: DateTime<Utc>) -> Vec<String> {
    let mut errors = Vec::new();

    let digits = record
        .cc_number_masked
        .chars()
        .filter(char::is_ascii_digit)
        .count();
    if digits < 4 {
        errors.push("masked card number has fewer than 4 digits".into());
    }

    match parse_expiry(&record.cc_exp) {
        Some((month, year)) => {
            if (year, month) < (now.year(), now.month()) {
                errors.push(format!("card expired {:02}/{:02}", month, year % 100));
            }
        }
        None => errors.push(format!("malformed expiry '{}', expected MMYY", record.cc_exp)),
    }

    if record.card_type.as_deref().is_none_or(str::is_empty) {
        errors.push("card type missing".into());
    }

    errors
}

/// Parses `MMYY` into (month, full year).
fn parse_expiry(exp: &str) -> Option<(u32, i32)> {
    if exp.len() != 4 || !exp.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let month: u32 = exp[..2].parse().ok()?;
    let year: i32 = exp[2..].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((month, 2000 + year))
}

fn assess_risk(
    record: &LegacyVaultRecord,
    validation_errors: &[String],
    now: DateTime<Utc>,
) -> RiskAssessment {
    let mut score: u32 = 0;
    let mut factors = Vec::new();

    if record.chargebacks > 0 {
        // Wire-supplied counter, saturating keeps an absurd value from
        // wrapping before the clamp.
        score = score.saturating_add(record.chargebacks.saturating_mul(CHARGEBACK_WEIGHT));
        factors.push(format!("{} chargeback(s) on this vault entry", record.chargebacks));
    }

    if let Some(signup) = record.signup_date {
        let months = (now.signed_duration_since(signup).num_days() / 30).max(0);
        let bonus = match months {
            0..3 => 15,
            3..6 => 10,
            6..12 => 5,
            _ => 0,
        };
        if bonus > 0 {
            score += bonus;
            factors.push(format!("account only {months} month(s) old"));
        }
    }

    if !validation_errors.is_empty() {
        score += INVALID_METHOD_WEIGHT;
        factors.push("payment method failed validation".into());
    }

    match record.status {
        VaultStatus::Disabled => {
            score += DISABLED_STATUS_WEIGHT;
            factors.push("vault entry disabled".into());
        }
        VaultStatus::Expired => {
            score += EXPIRED_STATUS_WEIGHT;
            factors.push("vault entry expired".into());
        }
        VaultStatus::Active => {}
    }

    if record.email.as_deref().is_none_or(str::is_empty) {
        score += MISSING_CONTACT_WEIGHT;
        factors.push("no email on file".into());
    }
    if record.phone.as_deref().is_none_or(str::is_empty) {
        score += MISSING_CONTACT_WEIGHT;
        factors.push("no phone on file".into());
    }

    if let Some(notes) = record.notes.as_deref() {
        let lower = notes.to_ascii_lowercase();
        for keyword in RISK_KEYWORDS {
            if lower.contains(keyword) {
                score += NOTE_KEYWORD_WEIGHT;
                factors.push(format!("risk language in notes: '{keyword}'"));
            }
        }
    }

    let score = score.min(100) as u8;
    RiskAssessment {
        score,
        factors,
        recommendation: recommend(score),
    }
}

pub fn recommend(score: u8) -> Recommendation {
    if score < APPROVE_BELOW {
        Recommendation::Approve
    } else if score < REVIEW_BELOW {
        Recommendation::Review
    } else {
        Recommendation::Reject
    }
}

/// New vault ids are namespaced `nv_` so they can never collide with the
/// legacy `lv_` space.
fn new_vault_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("nv_{}_{}", now.timestamp_millis(), suffix)
}

/// Shape check used by the token-validation endpoint.
pub fn is_valid_new_vault_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix("nv_") else {
        return false;
    };
    let mut parts = rest.splitn(2, '_');
    let ts_ok = parts
        .next()
        .is_some_and(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()));
    let suffix_ok = parts
        .next()
        .is_some_and(|s| s.len() == 6 && s.chars().all(|c| c.is_ascii_alphanumeric()));
    ts_ok && suffix_ok
}
