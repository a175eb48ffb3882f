use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;
use std::time::Instant;

use crate::client_id::ClientId;
use crate::error::AppError;
use crate::metrics::{QUOTA_DENIED, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{JournalRequest, ReplyResponse};
use crate::quota::Admission;
use crate::state::AppState;

// POST /gemini - journal entry in, supportive reply out
pub async fn journal_handler(
    State(state): State<Arc<AppState>>,
    ClientId(client): ClientId,
    payload: Result<Json<JournalRequest>, JsonRejection>,
) -> Result<Json<ReplyResponse>, AppError> {
    REQUEST_TOTAL.inc();

    // unreadable body counts as a missing entry
    let entry = payload
        .ok()
        .and_then(|Json(request)| request.entry())
        .ok_or(AppError::MissingEntry)?;

    let permit = match state.quota.try_acquire(&client, Instant::now()) {
        Admission::Granted(permit) => permit,
        Admission::Denied { retry_after } => {
            QUOTA_DENIED.inc();
            return Err(AppError::QuotaExceeded {
                client,
                retry_after,
            });
        }
    };

    let start_time = Instant::now();

    // on failure the permit is dropped and the unit goes back
    let completion = state.relay.reply(&entry).await?;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    permit.commit();

    tracing::info!(
        %client,
        model = %completion.model,
        fell_back = completion.fell_back,
        "Reply generated"
    );

    Ok(Json(ReplyResponse {
        reply: completion.text,
    }))
}
