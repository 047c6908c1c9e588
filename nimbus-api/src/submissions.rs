use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use nimbus_order::{Quote, SubmissionDraft, SubmissionOutcome};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/quotes", post(quote))
        .route("/v1/submissions", post(submit))
}

/// POST /v1/quotes
/// Prices and validates a draft without submitting it
async fn quote(State(state): State<AppState>, Json(draft): Json<SubmissionDraft>) -> Json<Quote> {
    let catalog = state.catalog.read().await;
    Json(state.orchestrator.quote(&draft, &catalog))
}

/// POST /v1/submissions
async fn submit(
    State(state): State<AppState>,
    Json(draft): Json<SubmissionDraft>,
) -> Result<(StatusCode, Json<SubmissionOutcome>), AppError> {
    let catalog = state.catalog.read().await.clone();
    let outcome = state
        .orchestrator
        .submit(&draft, &catalog)
        .await
        .map_err(AppError::from_submission)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
