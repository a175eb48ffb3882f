use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::relay::RelayError;

pub const MISSING_ENTRY_MESSAGE: &str = "Missing journal entry.";
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Try again later.";
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to get response from Gemini.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing journal entry")]
    MissingEntry,

    #[error("quota exceeded for client {client}")]
    QuotaExceeded { client: String, retry_after: Duration },

    #[error(transparent)]
    Upstream(#[from] RelayError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MissingEntry => error_response(StatusCode::BAD_REQUEST, MISSING_ENTRY_MESSAGE),
            AppError::QuotaExceeded {
                client,
                retry_after,
            } => {
                tracing::info!(%client, retry_after = retry_after.as_secs(), "Quota exceeded");

                let mut res = error_response(StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE);
                res.headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
                res
            }
            AppError::Upstream(err) => {
                // details stay server side
                tracing::error!(error = %err, "Gemini API error");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILURE_MESSAGE)
            }
        }
    }
}

fn error_response(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// Whole seconds, rounded up, never zero
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}
