//! HTTP/JSON surface.
//!
//! Start endpoints validate the request synchronously, hand the batch to a
//! spawned task, and answer immediately with a batch id; progress is polled
//! out of band. Schema violations and count mismatches are rejected with
//! 400 and a structured issue list before any job exists.

pub mod dto;
pub mod error;
pub mod jobs;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::error;
use uuid::Uuid;

use crate::application::classifier::Classifier;
use crate::application::orchestrator::{BatchOrchestrator, CancelFlag, RecordProcessor};
use crate::application::transactions::TransactionProcessor;
use crate::application::vault::is_valid_new_vault_id;
use crate::domain::job::{ImportJob, JobKind, JobProgress, JobStatus};
use crate::domain::ports::{EnrichmentProviderRef, JobRepositoryRef};
use self::dto::{
    BatchClassifyRequest, BatchClassifyResponse, StartBatchResponse, StartClientImportRequest,
    StartTransactionMigrationRequest, StartVaultMigrationRequest, ValidateVaultTokensRequest,
    ValidateVaultTokensResponse, VaultTokenValidity,
};
use self::error::{ApiJson, bad_request, internal_error, not_found};
use self::jobs::{
    ClassificationStats, ClientImportProcessor, TransactionJobProcessor, TransactionStats,
    VaultJobProcessor,
};

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub enrichment: EnrichmentProviderRef,
    pub repo: JobRepositoryRef,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub classification_stats: Arc<RwLock<ClassificationStats>>,
    pub transaction_stats: Arc<RwLock<TransactionStats>>,
    pub cancel_flags: Arc<RwLock<HashMap<String, CancelFlag>>>,
}

impl AppState {
    pub fn new(
        repo: JobRepositoryRef,
        enrichment: EnrichmentProviderRef,
        orchestrator: Arc<BatchOrchestrator>,
    ) -> Self {
        Self {
            classifier: Arc::new(Classifier::new()),
            enrichment,
            repo,
            orchestrator,
            classification_stats: Arc::new(RwLock::new(ClassificationStats::default())),
            transaction_stats: Arc::new(RwLock::new(TransactionStats::default())),
            cancel_flags: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/classify", post(classify_one))
        .route("/classify/batch", post(classify_batch))
        .route("/classify/stats", get(classification_stats))
        .route("/migrations/vault", post(start_vault_migration))
        .route("/migrations/vault/validate", post(validate_vault_tokens))
        .route("/migrations/transactions", post(start_transaction_migration))
        .route("/migrations/transactions/stats", get(transaction_stats))
        .route("/migrations/progress/{batch_id}", get(migration_progress))
        .route("/migrations/{batch_id}/cancel", post(cancel_batch))
        .route("/imports/clients", post(start_client_import))
        .route("/imports/status", get(imports_status))
        .route("/imports/{batch_id}", delete(purge_batch))
        .with_state(state)
}

async fn classify_one(
    State(state): State<AppState>,
    ApiJson(record): ApiJson<crate::domain::client::ClientRecord>,
) -> Response {
    let result = state.classifier.classify(&record);
    state.classification_stats.write().await.record(&result);
    Json(result).into_response()
}

async fn classify_batch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchClassifyRequest>,
) -> Response {
    if request.clients.is_empty() {
        return bad_request("empty batch", vec!["clients must not be empty".into()]);
    }
    let mut results = Vec::with_capacity(request.clients.len());
    {
        let mut stats = state.classification_stats.write().await;
        for client in &request.clients {
            let result = state.classifier.classify(client);
            stats.record(&result);
            results.push(result);
        }
    }
    Json(BatchClassifyResponse {
        results,
        errors: vec![],
    })
    .into_response()
}

async fn classification_stats(State(state): State<AppState>) -> Response {
    Json(state.classification_stats.read().await.clone()).into_response()
}

async fn start_vault_migration(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StartVaultMigrationRequest>,
) -> Response {
    let mut issues = Vec::new();
    if request.legacy_vault_records.is_empty() {
        issues.push("legacy_vault_records must not be empty".into());
    }
    if request.legacy_vault_records.len() != request.total_records {
        issues.push(format!(
            "total_records is {} but {} record(s) were submitted",
            request.total_records,
            request.legacy_vault_records.len()
        ));
    }
    if !issues.is_empty() {
        return bad_request("vault migration request rejected", issues);
    }

    let batch_id = resolve_batch_id(request.import_batch_id);
    if let Some(response) = reject_duplicate_batch(&state, &batch_id).await {
        return response;
    }

    let cancel = register_cancel_flag(&state, &batch_id).await;
    let records = request.legacy_vault_records;
    let total = request.total_records;
    let task_state = state.clone();
    let task_batch_id = batch_id.clone();
    tokio::spawn(async move {
        let processor = VaultJobProcessor::new();
        run_in_background(
            task_state,
            task_batch_id,
            JobKind::VaultMigration,
            records,
            total,
            processor,
            cancel,
        )
        .await;
    });

    accepted(batch_id)
}

async fn start_transaction_migration(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StartTransactionMigrationRequest>,
) -> Response {
    let mut issues = Vec::new();
    if request.transactions.is_empty() {
        issues.push("transactions must not be empty".into());
    }
    if request.transactions.len() != request.total_expected {
        issues.push(format!(
            "total_expected is {} but {} transaction(s) were submitted",
            request.total_expected,
            request.transactions.len()
        ));
    }
    if let Some(range) = &request.date_range
        && range.start > range.end
    {
        issues.push("date_range start is after end".into());
    }
    if !issues.is_empty() {
        return bad_request("transaction migration request rejected", issues);
    }

    let batch_id = resolve_batch_id(request.import_batch_id);
    if let Some(response) = reject_duplicate_batch(&state, &batch_id).await {
        return response;
    }

    let cancel = register_cancel_flag(&state, &batch_id).await;
    let records = request.transactions;
    let total = request.total_expected;
    let task_state = state.clone();
    let task_batch_id = batch_id.clone();
    tokio::spawn(async move {
        let processor = TransactionJobProcessor::new(
            TransactionProcessor::new(task_state.enrichment.clone()),
            task_state.transaction_stats.clone(),
        );
        run_in_background(
            task_state,
            task_batch_id,
            JobKind::TransactionMigration,
            records,
            total,
            processor,
            cancel,
        )
        .await;
    });

    accepted(batch_id)
}

async fn start_client_import(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<StartClientImportRequest>,
) -> Response {
    let mut issues = Vec::new();
    if request.clients.is_empty() {
        issues.push("clients must not be empty".into());
    }
    if request.clients.len() != request.total_expected_count {
        issues.push(format!(
            "total_expected_count is {} but {} client(s) were submitted",
            request.total_expected_count,
            request.clients.len()
        ));
    }
    if !issues.is_empty() {
        return bad_request("client import request rejected", issues);
    }

    let batch_id = resolve_batch_id(request.import_batch_id);
    if let Some(response) = reject_duplicate_batch(&state, &batch_id).await {
        return response;
    }

    let cancel = register_cancel_flag(&state, &batch_id).await;
    let records = request.clients;
    let total = request.total_expected_count;
    let task_state = state.clone();
    let task_batch_id = batch_id.clone();
    tokio::spawn(async move {
        let processor = ClientImportProcessor::new(
            task_state.classifier.clone(),
            task_state.classification_stats.clone(),
        );
        run_in_background(
            task_state,
            task_batch_id,
            JobKind::ClientImport,
            records,
            total,
            processor,
            cancel,
        )
        .await;
    });

    accepted(batch_id)
}

async fn migration_progress(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Response {
    match state.repo.get(&batch_id).await {
        Ok(Some(job)) => Json(job.progress(Utc::now())).into_response(),
        Ok(None) => not_found(&format!("unknown batch: {batch_id}")),
        Err(e) => internal_error(&e),
    }
}

async fn validate_vault_tokens(ApiJson(request): ApiJson<ValidateVaultTokensRequest>) -> Response {
    let results = request
        .vault_ids
        .iter()
        .map(|id| VaultTokenValidity {
            vault_id: id.clone(),
            valid: is_valid_new_vault_id(id),
        })
        .collect();
    Json(ValidateVaultTokensResponse { results }).into_response()
}

async fn transaction_stats(State(state): State<AppState>) -> Response {
    Json(state.transaction_stats.read().await.clone()).into_response()
}

async fn imports_status(State(state): State<AppState>) -> Response {
    let jobs = match state.repo.all().await {
        Ok(jobs) => jobs,
        Err(e) => return internal_error(&e),
    };
    let now = Utc::now();
    let (active, completed): (Vec<&ImportJob>, Vec<&ImportJob>) =
        jobs.iter().partition(|j| !j.status.is_terminal());
    let active: Vec<JobProgress> = active.iter().map(|j| j.progress(now)).collect();
    let completed: Vec<JobProgress> = completed.iter().map(|j| j.progress(now)).collect();
    Json(json!({
        "active_count": active.len(),
        "completed_count": completed.len(),
        "active": active,
        "completed": completed,
    }))
    .into_response()
}

async fn cancel_batch(State(state): State<AppState>, Path(batch_id): Path<String>) -> Response {
    let flags = state.cancel_flags.read().await;
    match flags.get(&batch_id) {
        Some(flag) => {
            flag.cancel();
            Json(json!({ "batch_id": batch_id, "cancelled": true })).into_response()
        }
        None => not_found(&format!("unknown batch: {batch_id}")),
    }
}

async fn purge_batch(State(state): State<AppState>, Path(batch_id): Path<String>) -> Response {
    match state.orchestrator.purge(&batch_id).await {
        Ok(()) => {
            state.cancel_flags.write().await.remove(&batch_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e @ crate::error::MigrationError::JobNotFound(_)) => not_found(&e.to_string()),
        Err(crate::error::MigrationError::JobNotTerminal(id)) => bad_request(
            "job is still running",
            vec![format!("batch {id} has not reached a terminal state")],
        ),
        Err(e) => internal_error(&e),
    }
}

fn resolve_batch_id(requested: Option<String>) -> String {
    requested
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

async fn reject_duplicate_batch(state: &AppState, batch_id: &str) -> Option<Response> {
    match state.repo.get(batch_id).await {
        Ok(Some(_)) => Some(bad_request(
            "batch id already in use",
            vec![format!("a job named {batch_id} already exists")],
        )),
        Ok(None) => None,
        Err(e) => Some(internal_error(&e)),
    }
}

async fn register_cancel_flag(state: &AppState, batch_id: &str) -> CancelFlag {
    let flag = CancelFlag::new();
    state
        .cancel_flags
        .write()
        .await
        .insert(batch_id.to_string(), flag.clone());
    flag
}

fn accepted(batch_id: String) -> Response {
    let body = StartBatchResponse {
        progress_endpoint: format!("/migrations/progress/{batch_id}"),
        batch_id,
    };
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

/// Runs a batch on a background task. Per-record failures are absorbed by
/// the orchestrator; anything that escapes it marks the job FAILED so
/// already-recorded progress is not lost.
async fn run_in_background<P>(
    state: AppState,
    batch_id: String,
    kind: JobKind,
    records: Vec<P::Record>,
    declared_total: usize,
    processor: P,
    cancel: CancelFlag,
) where
    P: RecordProcessor,
{
    let outcome = state
        .orchestrator
        .run(&batch_id, kind, &records, declared_total, &processor, &cancel)
        .await;

    if let Err(e) = outcome {
        error!(batch_id, error = %e, "batch run aborted");
        if let Ok(Some(mut job)) = state.repo.get(&batch_id).await
            && !job.status.is_terminal()
            && job.transition(JobStatus::Failed).is_ok()
        {
            let _ = state.repo.save(job).await;
        }
    }
}
