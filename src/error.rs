use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::services::notification_service::NotificationError;
use crate::services::scoring_service::ScoringError;
use crate::utils::validation::SubmissionRejection;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Submission rejected: {0}")]
    Submission(#[from] SubmissionRejection),

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Notification failed: {0}")]
    Notification(#[from] NotificationError),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Submission(rejection) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": rejection.to_string(), "reason": rejection.code() }),
            ),
            Error::RateLimited { retry_after_secs } => {
                let body = Json(json!({
                    "error": "Too many submissions. Please try again later.",
                    "retryAfter": retry_after_secs,
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }
            Error::Scoring(err) => {
                tracing::error!(error = %err, "screening failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": err.user_message() }),
                )
            }
            Error::Notification(NotificationError::CandidateNotFound(id)) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("Candidate {} not found", id) }),
            ),
            Error::Notification(err) => {
                tracing::error!(error = %err, "notification failed");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "Failed to send email" }),
                )
            }
            Error::Multipart(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An unexpected error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
