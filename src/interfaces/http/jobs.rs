//! Engine adapters for batch execution, plus the aggregate counters the
//! stats endpoints serve.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::application::classifier::Classifier;
use crate::application::orchestrator::{RecordFailure, RecordProcessor};
use crate::application::transactions::TransactionProcessor;
use crate::application::vault::VaultMigrator;
use crate::domain::classification::ClassificationResult;
use crate::domain::client::ClientRecord;
use crate::domain::transaction::{ProcessedTransaction, ProcessingStatus, TransactionRecord};
use crate::domain::vault::{LegacyVaultRecord, MappingStatus, TokenMapping};

#[derive(Debug, Default, Serialize, Clone)]
pub struct ClassificationStats {
    pub total_classified: u64,
    pub dispositions: HashMap<String, u64>,
    pub risk_low: u64,
    pub risk_medium: u64,
    pub risk_high: u64,
    pub compliance_review: u64,
}

impl ClassificationStats {
    pub fn record(&mut self, result: &ClassificationResult) {
        self.total_classified += 1;
        *self
            .dispositions
            .entry(result.disposition.as_str().to_string())
            .or_default() += 1;
        match result.risk_score {
            0..30 => self.risk_low += 1,
            30..70 => self.risk_medium += 1,
            _ => self.risk_high += 1,
        }
        if result.compliance_review_required {
            self.compliance_review += 1;
        }
    }
}

#[derive(Debug, Default, Serialize, Clone)]
pub struct TransactionStats {
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub needs_review: u64,
    pub risk_low: u64,
    pub risk_medium: u64,
    pub risk_high: u64,
}

impl TransactionStats {
    pub fn record(&mut self, result: &ProcessedTransaction) {
        self.processed += 1;
        match result.status {
            ProcessingStatus::Success => self.successful += 1,
            ProcessingStatus::Failed => self.failed += 1,
            ProcessingStatus::NeedsReview => self.needs_review += 1,
        }
        match result.risk.score {
            0..30 => self.risk_low += 1,
            30..70 => self.risk_medium += 1,
            _ => self.risk_high += 1,
        }
    }
}

/// War-chest client import: the per-record work is classification.
pub struct ClientImportProcessor {
    classifier: Arc<Classifier>,
    stats: Arc<RwLock<ClassificationStats>>,
}

impl ClientImportProcessor {
    pub fn new(classifier: Arc<Classifier>, stats: Arc<RwLock<ClassificationStats>>) -> Self {
        Self { classifier, stats }
    }
}

#[async_trait]
impl RecordProcessor for ClientImportProcessor {
    type Record = ClientRecord;
    type Output = ClassificationResult;

    fn record_id(&self, record: &ClientRecord) -> String {
        record.client_id.clone()
    }

    async fn process(
        &self,
        record: &ClientRecord,
    ) -> std::result::Result<ClassificationResult, RecordFailure> {
        let result = self.classifier.classify(record);
        self.stats.write().await.record(&result);
        Ok(result)
    }
}

/// Vault records share one migrator per run so the duplicate fingerprint
/// set spans the whole batch.
pub struct VaultJobProcessor {
    migrator: Mutex<VaultMigrator>,
}

impl VaultJobProcessor {
    pub fn new() -> Self {
        Self {
            migrator: Mutex::new(VaultMigrator::new()),
        }
    }
}

impl Default for VaultJobProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordProcessor for VaultJobProcessor {
    type Record = LegacyVaultRecord;
    type Output = TokenMapping;

    fn record_id(&self, record: &LegacyVaultRecord) -> String {
        record.legacy_vault_id.clone()
    }

    async fn process(
        &self,
        record: &LegacyVaultRecord,
    ) -> std::result::Result<TokenMapping, RecordFailure> {
        let mapping = self.migrator.lock().await.migrate(record);
        if mapping.status == MappingStatus::Failed {
            return Err(RecordFailure::new(
                mapping.validation_errors.join("; "),
                "VALIDATION_FAILED",
            ));
        }
        Ok(mapping)
    }
}

pub struct TransactionJobProcessor {
    processor: TransactionProcessor,
    stats: Arc<RwLock<TransactionStats>>,
}

impl TransactionJobProcessor {
    pub fn new(processor: TransactionProcessor, stats: Arc<RwLock<TransactionStats>>) -> Self {
        Self { processor, stats }
    }
}

#[async_trait]
impl RecordProcessor for TransactionJobProcessor {
    type Record = TransactionRecord;
    type Output = ProcessedTransaction;

    fn record_id(&self, record: &TransactionRecord) -> String {
        record.transaction_id.clone()
    }

    async fn process(
        &self,
        record: &TransactionRecord,
    ) -> std::result::Result<ProcessedTransaction, RecordFailure> {
        let result = self
            .processor
            .process(record)
            .await
            .map_err(|e| RecordFailure::new(e.to_string(), "ENRICHMENT_ERROR"))?;
        self.stats.write().await.record(&result);
        if result.status == ProcessingStatus::Failed {
            return Err(RecordFailure::new(
                result.validation.errors.join("; "),
                "VALIDATION_FAILED",
            ));
        }
        Ok(result)
    }
}
