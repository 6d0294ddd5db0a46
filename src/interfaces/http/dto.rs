use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::classification::ClassificationResult;
use crate::domain::client::ClientRecord;
use crate::domain::job::JobError;
use crate::domain::transaction::TransactionRecord;
use crate::domain::vault::LegacyVaultRecord;

#[derive(Debug, Deserialize)]
pub struct BatchClassifyRequest {
    pub clients: Vec<ClientRecord>,
}

#[derive(Debug, Serialize)]
pub struct BatchClassifyResponse {
    pub results: Vec<ClassificationResult>,
    /// Capped per-record error detail; empty when every client classified.
    pub errors: Vec<JobError>,
}

#[derive(Debug, Deserialize)]
pub struct StartVaultMigrationRequest {
    pub legacy_vault_records: Vec<LegacyVaultRecord>,
    pub import_batch_id: Option<String>,
    pub total_records: usize,
}

#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct StartTransactionMigrationRequest {
    pub transactions: Vec<TransactionRecord>,
    pub import_batch_id: Option<String>,
    pub date_range: Option<DateRange>,
    pub total_expected: usize,
}

#[derive(Debug, Deserialize)]
pub struct StartClientImportRequest {
    pub clients: Vec<ClientRecord>,
    pub import_batch_id: Option<String>,
    pub total_expected_count: usize,
}

/// Returned by every start endpoint; work continues out of band.
#[derive(Debug, Serialize)]
pub struct StartBatchResponse {
    pub batch_id: String,
    pub progress_endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateVaultTokensRequest {
    pub vault_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VaultTokenValidity {
    pub vault_id: String,
    pub valid: bool,
}

#[derive(Debug, Serialize)]
pub struct ValidateVaultTokensResponse {
    pub results: Vec<VaultTokenValidity>,
}
