use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use crate::error::MigrationError;

/// `Json` body extractor whose rejection uses the same wire shape as every
/// other 4xx. Malformed bodies come back as 400 with the serde message in
/// the issue list rather than axum's plain-text 422.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(bad_request(
                "request body failed validation",
                vec![rejection.body_text()],
            )),
        }
    }
}

/// Wire shape for every non-2xx response: `{"error": {code, message,
/// issues}}`.
#[derive(Debug, Serialize, Clone)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub issues: Vec<String>,
}

pub fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let body = Json(json!({ "error": err }));
    (status, body).into_response()
}

pub fn bad_request(message: &str, issues: Vec<String>) -> Response {
    api_error_response(
        StatusCode::BAD_REQUEST,
        ApiError {
            code: "VALIDATION_FAILED".into(),
            message: message.to_string(),
            issues,
        },
    )
}

pub fn not_found(message: &str) -> Response {
    api_error_response(
        StatusCode::NOT_FOUND,
        ApiError {
            code: "NOT_FOUND".into(),
            message: message.to_string(),
            issues: vec![],
        },
    )
}

pub fn internal_error(err: &MigrationError) -> Response {
    api_error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ApiError {
            code: "INTERNAL_ERROR".into(),
            message: err.to_string(),
            issues: vec![],
        },
    )
}
