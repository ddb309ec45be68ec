use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};

use crate::dto::screening_dto::{
    fields, JsonSubmission, RawResume, RawSubmission, ResumeFile, ScreeningResponse,
};
use crate::error::{Error, Result};
use crate::models::candidate::NewCandidate;
use crate::models::screening::CanonicalScreeningResult;
use crate::utils::text::redact_email;
use crate::utils::validation::{check_submission, CheckedSubmission};
use crate::AppState;

async fn read_multipart(mut multipart: Multipart) -> Result<RawSubmission> {
    let mut submission = RawSubmission {
        full_name: String::new(),
        email: String::new(),
        job_description: String::new(),
        honeypot: String::new(),
        resume: RawResume::Upload(None),
    };

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            fields::FULL_NAME => submission.full_name = field.text().await?,
            fields::EMAIL => submission.email = field.text().await?,
            fields::JOB_DESCRIPTION => submission.job_description = field.text().await?,
            fields::HONEYPOT => submission.honeypot = field.text().await?,
            fields::RESUME => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                submission.resume = RawResume::Upload(Some(ResumeFile {
                    file_name,
                    content_type,
                    bytes,
                }));
            }
            other => tracing::debug!(field = %other, "ignoring unknown form field"),
        }
    }

    Ok(submission)
}

async fn read_submission(state: &AppState, req: Request) -> Result<RawSubmission> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?;
        read_multipart(multipart).await
    } else {
        let Json(body) = Json::<JsonSubmission>::from_request(req, state)
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?;
        Ok(body.into())
    }
}

/// Validate, score, persist, then queue the candidate email.
pub async fn submit_screening(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<ScreeningResponse>> {
    let raw = read_submission(&state, req).await?;

    let input = match check_submission(raw, state.max_resume_bytes)? {
        CheckedSubmission::Bot => {
            tracing::info!("honeypot triggered, returning placeholder result");
            return Ok(Json(ScreeningResponse {
                result: CanonicalScreeningResult::bot_hold(),
                candidate_id: None,
            }));
        }
        CheckedSubmission::Accepted(input) => input,
    };

    tracing::info!(email = %redact_email(&input.email), "screening submission received");
    let scored = state.scoring_service.score(&input).await?;
    tracing::info!(
        source = ?scored.source,
        score = scored.result.overall_score,
        verdict = %scored.result.normalized_verdict,
        "submission scored"
    );

    let candidate = NewCandidate::new(
        &input.full_name,
        &input.email,
        &input.job_description,
        scored.result.clone(),
    );
    let candidate_id = match state.store.insert(candidate).await {
        Ok(record) => {
            state.notification_queue.enqueue(record.id);
            Some(record.id)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to persist candidate; skipping notification");
            None
        }
    };

    Ok(Json(ScreeningResponse {
        result: scored.result,
        candidate_id,
    }))
}
