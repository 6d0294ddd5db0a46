mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;
use vaultshift::application::orchestrator::{BatchConfig, BatchOrchestrator};
use vaultshift::domain::ports::{EnrichmentProviderRef, JobRepositoryRef};
use vaultshift::infrastructure::in_memory::{InMemoryJobRepository, StaticEnrichment};
use vaultshift::interfaces::http::{AppState, router};

fn test_app() -> Router {
    let repo: JobRepositoryRef = Arc::new(InMemoryJobRepository::new());
    let enrichment: EnrichmentProviderRef = Arc::new(StaticEnrichment::default());
    let orchestrator = Arc::new(BatchOrchestrator::new(
        repo.clone(),
        BatchConfig {
            chunk_size: 10,
            chunk_delay: Duration::ZERO,
            max_recorded_errors: 100,
        },
    ));
    router(AppState::new(repo, enrichment, orchestrator))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn client_json(id: &str) -> Value {
    serde_json::to_value(common::client(id)).unwrap()
}

async fn poll_until_terminal(app: &Router, endpoint: &str) -> Value {
    for _ in 0..100 {
        let response = app.clone().oneshot(get(endpoint)).await.unwrap();
        if response.status() == StatusCode::OK {
            let progress = body_json(response).await;
            let status = progress["status"].as_str().unwrap_or_default().to_string();
            if status == "COMPLETED" || status == "FAILED" {
                return progress;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("batch never reached a terminal state at {endpoint}");
}

#[tokio::test]
async fn classify_single_client() {
    let app = test_app();
    let mut record = common::client("http-1");
    record.compliance_flags = vec!["FRAUD_CONFIRMED".into()];

    let response = app
        .oneshot(post_json("/classify", &serde_json::to_value(&record).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["disposition"], "DO_NOT_BILL");
    assert_eq!(body["compliance_review_required"], true);
}

#[tokio::test]
async fn classify_batch_and_stats() {
    let app = test_app();
    let request = json!({
        "clients": [client_json("b-1"), client_json("b-2")]
    });

    let response = app.clone().oneshot(post_json("/classify/batch", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let stats = body_json(app.oneshot(get("/classify/stats")).await.unwrap()).await;
    assert_eq!(stats["total_classified"], 2);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/classify/batch")
                .header("content-type", "application/json")
                .body(Body::from("{\"clients\": \"not-a-list\"}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert!(body["error"]["message"].is_string());
    let issues = body["error"]["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].as_str().unwrap().contains("clients"));
}

#[tokio::test]
async fn non_json_body_is_rejected_with_issue_list() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/classify")
                .header("content-type", "application/json")
                .body(Body::from("not json at all"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert!(!body["error"]["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn vault_migration_count_mismatch_is_rejected_up_front() {
    let app = test_app();
    let record = serde_json::to_value(common::vault_record(
        "lv-1",
        "a@example.test",
        "411111******1111",
    ))
    .unwrap();
    let request = json!({
        "legacy_vault_records": [record],
        "total_records": 3
    });

    let response = app.clone().oneshot(post_json("/migrations/vault", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert!(!body["error"]["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn vault_migration_runs_to_completion() {
    let app = test_app();
    let records: Vec<Value> = (0..3)
        .map(|i| {
            serde_json::to_value(common::vault_record(
                &format!("lv-{i}"),
                &format!("u{i}@example.test"),
                &format!("411111******{i}{i}{i}{i}"),
            ))
            .unwrap()
        })
        .collect();
    let request = json!({
        "legacy_vault_records": records,
        "import_batch_id": "vault-http-1",
        "total_records": 3
    });

    let response = app.clone().oneshot(post_json("/migrations/vault", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["batch_id"], "vault-http-1");
    let endpoint = body["progress_endpoint"].as_str().unwrap().to_string();

    let progress = poll_until_terminal(&app, &endpoint).await;
    assert_eq!(progress["status"], "COMPLETED");
    assert_eq!(progress["processed_records"], 3);
    assert_eq!(progress["success_count"], 3);
}

#[tokio::test]
async fn transaction_migration_reports_failures_in_progress() {
    let app = test_app();
    let mut records = Vec::new();
    for i in 0..20 {
        let amount = if i < 2 { dec!(0) } else { dec!(30.00) };
        records.push(serde_json::to_value(common::transaction(&format!("tx-{i}"), amount)).unwrap());
    }
    let request = json!({
        "transactions": records,
        "import_batch_id": "tx-http-1",
        "total_expected": 20
    });

    let response = app
        .clone()
        .oneshot(post_json("/migrations/transactions", &request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let progress = poll_until_terminal(&app, "/migrations/progress/tx-http-1").await;
    assert_eq!(progress["failure_count"], 2);
    assert_eq!(progress["success_count"], 18);

    let stats = body_json(
        app.oneshot(get("/migrations/transactions/stats")).await.unwrap(),
    )
    .await;
    assert_eq!(stats["processed"], 20);
    assert_eq!(stats["failed"], 2);
}

#[tokio::test]
async fn client_import_and_global_status() {
    let app = test_app();
    let request = json!({
        "clients": [client_json("imp-1"), client_json("imp-2")],
        "import_batch_id": "import-http-1",
        "total_expected_count": 2
    });

    let response = app.clone().oneshot(post_json("/imports/clients", &request)).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    poll_until_terminal(&app, "/migrations/progress/import-http-1").await;

    let status = body_json(app.clone().oneshot(get("/imports/status")).await.unwrap()).await;
    assert_eq!(status["completed_count"], 1);
    assert_eq!(status["active_count"], 0);
}

#[tokio::test]
async fn vault_token_validation_checks_namespace() {
    let app = test_app();
    let millis = Utc::now().timestamp_millis();
    let request = json!({
        "vault_ids": [format!("nv_{millis}_Ab12Cd"), "lv_legacy_token", "garbage"]
    });

    let response = app
        .oneshot(post_json("/migrations/vault/validate", &request))
        .await
        .unwrap();
    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["valid"], true);
    assert_eq!(results[1]["valid"], false);
    assert_eq!(results[2]["valid"], false);
}

#[tokio::test]
async fn purge_requires_terminal_job_and_progress_404s_after() {
    let app = test_app();
    let request = json!({
        "clients": [client_json("purge-1")],
        "import_batch_id": "purge-http-1",
        "total_expected_count": 1
    });
    app.clone()
        .oneshot(post_json("/imports/clients", &request))
        .await
        .unwrap();
    poll_until_terminal(&app, "/migrations/progress/purge-http-1").await;

    let delete = Request::builder()
        .method("DELETE")
        .uri("/imports/purge-http-1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get("/migrations/progress/purge-http-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_unknown_batch_is_404() {
    let app = test_app();
    let response = app
        .oneshot(post_json("/migrations/nope/cancel", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_batch_id_is_rejected() {
    let app = test_app();
    let request = json!({
        "clients": [client_json("dup-1")],
        "import_batch_id": "dup-http-1",
        "total_expected_count": 1
    });

    let first = app.clone().oneshot(post_json("/imports/clients", &request)).await.unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    poll_until_terminal(&app, "/migrations/progress/dup-http-1").await;

    let second = app.oneshot(post_json("/imports/clients", &request)).await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}
