//! Client risk scoring.
//!
//! A pure weighted-additive model over the record's historical signals.
//! Deterministic: the same record always produces the same score and the
//! same factor list, so re-running a record is always safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::client::ClientRecord;

const CHARGEBACK_WEIGHT: u32 = 22;
const FAILURE_RATIO_MAX: f64 = 30.0;
const FRAUD_INDICATOR_WEIGHT: u32 = 10;
const COMPLIANCE_FLAG_WEIGHT: u32 = 12;
const PENDING_DISPUTE_WEIGHT: u32 = 8;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct RiskScore {
    /// 0-100.
    pub score: u8,
    pub factors: Vec<String>,
}

/// Scores a client record against the weighted model, clamped to 0-100.
pub fn score_client(record: &ClientRecord, now: DateTime<Utc>) -> RiskScore {
    let mut score: u32 = 0;
    let mut factors = Vec::new();

    if record.chargebacks > 0 {
        // Counters come straight off the wire, so keep the math saturating;
        // the score is clamped to 100 below anyway.
        score = score.saturating_add(record.chargebacks.saturating_mul(CHARGEBACK_WEIGHT));
        factors.push(format!("{} chargeback(s) on file", record.chargebacks));
    }

    let attempts = record.successful_payments.saturating_add(record.failed_payments);
    if attempts > 0 && record.failed_payments > 0 {
        let ratio = record.failed_payments as f64 / attempts as f64;
        score += (ratio * FAILURE_RATIO_MAX).round() as u32;
        factors.push(format!(
            "payment failure ratio {:.0}% ({}/{})",
            ratio * 100.0,
            record.failed_payments,
            attempts
        ));
    }

    if !record.fraud_indicators.is_empty() {
        score += record.fraud_indicators.len() as u32 * FRAUD_INDICATOR_WEIGHT;
        for indicator in &record.fraud_indicators {
            factors.push(format!("fraud indicator: {indicator}"));
        }
    }

    if !record.compliance_flags.is_empty() {
        score += record.compliance_flags.len() as u32 * COMPLIANCE_FLAG_WEIGHT;
        for flag in &record.compliance_flags {
            factors.push(format!("compliance flag: {flag}"));
        }
    }

    let pending = record.pending_disputes() as u32;
    if pending > 0 {
        score += pending * PENDING_DISPUTE_WEIGHT;
        factors.push(format!("{pending} pending dispute(s)"));
    }

    if let Some(age) = record.account_age_months(now) {
        let bonus = match age {
            0..3 => 15,
            3..6 => 10,
            6..12 => 5,
            _ => 0,
        };
        if bonus > 0 {
            score += bonus;
            factors.push(format!("young account: {age} month(s) old"));
        }
    }

    RiskScore {
        score: score.min(100) as u8,
        factors,
    }
}
