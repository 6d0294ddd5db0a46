//! Chunked batch execution over the engines.
//!
//! The orchestrator owns all writes to a job: it validates the declared
//! total, creates the job, fans a chunk out, folds results back in input
//! order, snapshots the job through the repository, throttles, and moves
//! on. Individual record failures never abort the batch; only an aborted
//! run (cancellation, unexpected orchestrator error) marks a job FAILED.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::job::{ImportJob, JobError, JobKind, JobStatus};
use crate::domain::ports::JobRepositoryRef;
use crate::error::{MigrationError, Result};

/// Shared cancellation signal checked at chunk boundaries. Mid-chunk work
/// always completes.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A per-record failure surfaced to the job's error list.
#[derive(Debug, Clone)]
pub struct RecordFailure {
    pub message: String,
    pub code: String,
}

impl RecordFailure {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

/// One engine adapted to batch execution.
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    type Record: Send + Sync;
    type Output: Send;

    fn record_id(&self, record: &Self::Record) -> String;

    async fn process(
        &self,
        record: &Self::Record,
    ) -> std::result::Result<Self::Output, RecordFailure>;
}

#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Records per chunk; sized for downstream rate sensitivity.
    pub chunk_size: usize,
    /// Pause between chunks.
    pub chunk_delay: Duration,
    /// Cap on recorded error entries per job; counters keep the true total.
    pub max_recorded_errors: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 75,
            chunk_delay: Duration::from_millis(200),
            max_recorded_errors: 100,
        }
    }
}

/// Final view of a completed (or aborted) run: the job snapshot plus the
/// successful outputs, in input order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub job: ImportJob,
    pub outputs: Vec<T>,
}

pub struct BatchOrchestrator {
    repo: JobRepositoryRef,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(repo: JobRepositoryRef, config: BatchConfig) -> Self {
        Self { repo, config }
    }

    pub fn repository(&self) -> &JobRepositoryRef {
        &self.repo
    }

    /// Runs a whole batch through `processor`. Rejects up front when the
    /// declared total does not match the submitted count; no job is
    /// created in that case.
    pub async fn run<P: RecordProcessor>(
        &self,
        batch_id: &str,
        kind: JobKind,
        records: &[P::Record],
        declared_total: usize,
        processor: &P,
        cancel: &CancelFlag,
    ) -> Result<BatchReport<P::Output>> {
        if records.len() != declared_total {
            return Err(MigrationError::CountMismatch {
                declared: declared_total,
                submitted: records.len(),
            });
        }

        let mut job = ImportJob::new(batch_id, kind, records.len());
        self.repo.save(job.clone()).await?;
        job.transition(JobStatus::Processing)?;
        self.repo.save(job.clone()).await?;
        info!(batch_id, total = records.len(), "batch processing started");

        let mut outputs = Vec::new();
        let chunk_count = records.len().div_ceil(self.config.chunk_size.max(1));

        for (chunk_index, chunk) in records.chunks(self.config.chunk_size.max(1)).enumerate() {
            if cancel.is_cancelled() {
                warn!(batch_id, chunk_index, "batch cancelled");
                job.errors.push(JobError {
                    index: job.processed_records,
                    record_id: "-".into(),
                    message: "batch cancelled by operator".into(),
                    code: "CANCELLED".into(),
                });
                job.transition(JobStatus::Failed)?;
                self.repo.save(job.clone()).await?;
                return Ok(BatchReport { job, outputs });
            }

            let base = chunk_index * self.config.chunk_size;
            // Chunk fan-out, awaited together. join_all keeps results in
            // submission order, so the fold below preserves input order.
            let results = join_all(chunk.iter().map(|record| processor.process(record))).await;

            for (offset, (record, result)) in chunk.iter().zip(results).enumerate() {
                let index = base + offset;
                match result {
                    Ok(output) => {
                        job.record_success();
                        outputs.push(output);
                    }
                    Err(failure) => {
                        job.record_failure(
                            JobError {
                                index,
                                record_id: processor.record_id(record),
                                message: failure.message,
                                code: failure.code,
                            },
                            self.config.max_recorded_errors,
                        );
                    }
                }
            }

            self.repo.save(job.clone()).await?;
            debug!(
                batch_id,
                chunk_index,
                processed = job.processed_records,
                "chunk complete"
            );

            let last_chunk = chunk_index + 1 == chunk_count;
            if !last_chunk && !self.config.chunk_delay.is_zero() {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
        }

        job.transition(JobStatus::Completed)?;
        self.repo.save(job.clone()).await?;
        info!(
            batch_id,
            success = job.success_count,
            failed = job.failure_count,
            "batch complete"
        );
        Ok(BatchReport { job, outputs })
    }

    /// Operator-triggered purge of a finished job.
    pub async fn purge(&self, batch_id: &str) -> Result<()> {
        match self.repo.get(batch_id).await? {
            None => Err(MigrationError::JobNotFound(batch_id.to_string())),
            Some(job) if !job.status.is_terminal() => {
                Err(MigrationError::JobNotTerminal(batch_id.to_string()))
            }
            Some(_) => self.repo.remove(batch_id).await,
        }
    }
}
