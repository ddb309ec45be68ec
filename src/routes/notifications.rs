use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::dto::screening_dto::{EmailDispatchRequest, EmailDispatchResponse};
use crate::error::{Error, Result};
use crate::services::notification_service::NotifyOutcome;
use crate::utils::validation::validate;
use crate::AppState;

impl From<NotifyOutcome> for EmailDispatchResponse {
    fn from(outcome: NotifyOutcome) -> Self {
        match outcome {
            NotifyOutcome::Sent { kind, email_id } => Self {
                success: true,
                email_type: Some(kind),
                email_id: Some(email_id).filter(|id| !id.is_empty()),
                ..Default::default()
            },
            NotifyOutcome::Skipped { kind } => Self {
                success: true,
                skipped: Some(true),
                email_type: Some(kind),
                message: Some("Email sending is not configured".to_string()),
                ..Default::default()
            },
            NotifyOutcome::AlreadySent { kind } => Self {
                success: true,
                skipped: Some(true),
                email_type: Some(kind),
                message: Some("Email already sent".to_string()),
                ..Default::default()
            },
            NotifyOutcome::NotEligible => Self {
                success: true,
                message: Some("No email required for this result".to_string()),
                ..Default::default()
            },
        }
    }
}

pub async fn send_candidate_email(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EmailDispatchRequest>, JsonRejection>,
) -> Result<Json<EmailDispatchResponse>> {
    let Json(body) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    validate(&body)?;

    let outcome = state
        .notification_service
        .notify_payload(
            body.candidate_id,
            body.candidate_name.trim(),
            body.candidate_email.trim(),
            &body.result,
        )
        .await?;
    Ok(Json(outcome.into()))
}
