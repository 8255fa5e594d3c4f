use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::ledger::SettlementError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Too many requests, retry in {0} seconds")]
    RateLimited(u64),
    #[error("External error: {0}")]
    External(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

fn error_body(detail: &str) -> Json<serde_json::Value> {
    Json(json!({ "errors": [{ "detail": detail }] }))
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(&msg)).into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, error_body(&msg)).into_response(),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, error_body(&msg)).into_response(),
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, error_body("Authentication credentials were not provided or are invalid")).into_response()
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, error_body(&msg)).into_response(),
            AppError::RateLimited(wait) => {
                let mut headers = HeaderMap::new();
                if let Ok(value) = HeaderValue::from_str(&wait.to_string()) {
                    headers.insert("Retry-After", value);
                }
                let body = Json(json!({
                    "errors": [{ "detail": "Request was throttled", "wait_seconds": wait }]
                }));
                (StatusCode::TOO_MANY_REQUESTS, headers, body).into_response()
            }
            AppError::External(msg) => (StatusCode::BAD_GATEWAY, error_body(&msg)).into_response(),
            AppError::Db(e) => {
                error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, error_body("Internal Server Error")).into_response()
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, error_body("Internal Server Error")).into_response()
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}

impl From<SettlementError> for AppError {
    fn from(value: SettlementError) -> Self {
        match value {
            SettlementError::DealUnavailable(_) | SettlementError::InvestorUnavailable(_) => {
                AppError::NotFound(value.to_string())
            }
            other => AppError::Validation(other.to_string()),
        }
    }
}
