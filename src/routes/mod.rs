pub mod candidates;
pub mod health;
pub mod notifications;
pub mod screening;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::middleware::{auth::require_bearer_auth, rate_limit::rate_limit_middleware};
use crate::AppState;

/// Multipart framing and text fields on top of the resume itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let submission_api = Router::new()
        .route("/api/screenings", post(screening::submit_screening))
        .layer(DefaultBodyLimit::max(
            state.max_resume_bytes.saturating_mul(2) + FORM_OVERHEAD_BYTES,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let dashboard_api = Router::new()
        .route("/api/notifications", post(notifications::send_candidate_email))
        .route("/api/candidates", get(candidates::list_candidates))
        .route("/api/candidates/:id", get(candidates::get_candidate))
        .route("/api/candidates/:id/notify", post(candidates::notify_candidate))
        .layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            require_bearer_auth,
        ));

    base_routes
        .merge(submission_api)
        .merge(dashboard_api)
        .with_state(state)
}
