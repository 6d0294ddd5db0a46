use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, Result};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Started,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Started => "STARTED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

/// One recorded per-record failure. The list on the job is capped; the
/// failure counter keeps the true total.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct JobError {
    pub index: usize,
    pub record_id: String,
    pub message: String,
    pub code: String,
}

/// Mutable state of one batch run. The orchestrator is the only writer;
/// readers poll snapshots through the repository.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ImportJob {
    pub batch_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub total_records: usize,
    pub processed_records: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<JobError>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    VaultMigration,
    TransactionMigration,
    ClientImport,
}

impl ImportJob {
    pub fn new(batch_id: impl Into<String>, kind: JobKind, total_records: usize) -> Self {
        Self {
            batch_id: batch_id.into(),
            kind,
            status: JobStatus::Started,
            total_records,
            processed_records: 0,
            success_count: 0,
            failure_count: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Moves the job forward. Status is monotonic: STARTED -> PROCESSING ->
    /// {COMPLETED, FAILED}; anything else is rejected.
    pub fn transition(&mut self, next: JobStatus) -> Result<()> {
        use JobStatus::*;
        let allowed = matches!(
            (self.status, next),
            (Started, Processing) | (Processing, Completed) | (Processing, Failed) | (Started, Failed)
        );
        if !allowed {
            return Err(MigrationError::IllegalTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn record_success(&mut self) {
        self.processed_records += 1;
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, error: JobError, max_recorded: usize) {
        self.processed_records += 1;
        self.failure_count += 1;
        if self.errors.len() < max_recorded {
            self.errors.push(error);
        }
    }

    pub fn progress(&self, now: DateTime<Utc>) -> JobProgress {
        let percent = if self.total_records == 0 {
            100.0
        } else {
            self.processed_records as f64 / self.total_records as f64 * 100.0
        };
        let eta_seconds = self.eta_seconds(now);
        JobProgress {
            batch_id: self.batch_id.clone(),
            status: self.status,
            total_records: self.total_records,
            processed_records: self.processed_records,
            success_count: self.success_count,
            failure_count: self.failure_count,
            percent_complete: percent,
            eta_seconds,
        }
    }

    /// Linear extrapolation from elapsed time per processed record.
    fn eta_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        if self.status.is_terminal() || self.processed_records == 0 {
            return None;
        }
        let elapsed = now.signed_duration_since(self.started_at).num_milliseconds() as f64 / 1000.0;
        if elapsed <= 0.0 {
            return None;
        }
        let per_record = elapsed / self.processed_records as f64;
        let remaining = self.total_records.saturating_sub(self.processed_records);
        Some(per_record * remaining as f64)
    }
}

/// Read-only snapshot handed to progress pollers.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct JobProgress {
    pub batch_id: String,
    pub status: JobStatus,
    pub total_records: usize,
    pub processed_records: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub percent_complete: f64,
    pub eta_seconds: Option<f64>,
}
