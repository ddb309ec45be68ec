use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::candidate::{CandidateFilter, CandidateRecord};
use crate::services::notification_service::NotifyOutcome;
use crate::AppState;

pub async fn list_candidates(
    State(state): State<AppState>,
    Query(filter): Query<CandidateFilter>,
) -> Result<Json<Vec<CandidateRecord>>> {
    let rows = state.store.list(&filter).await?;
    Ok(Json(rows))
}

pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateRecord>> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
}

/// Runs the notifier for a stored candidate. Safe to repeat.
pub async fn notify_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotifyOutcome>> {
    let outcome = state.notification_service.notify_candidate(id).await?;
    Ok(Json(outcome))
}
