pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::middleware::{auth::AuthState, rate_limit::RateLimiter};
use crate::services::{
    candidate_service::CandidateStore,
    email_service::{EmailSender, ResendMailer},
    notification_service::{spawn_notification_worker, NotificationQueue, NotificationService},
    scoring_service::ScoringService,
};
use reqwest::Client;

/// Pending notifications held before new ones are dropped and logged.
pub const NOTIFICATION_QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CandidateStore>,
    pub scoring_service: ScoringService,
    pub notification_service: NotificationService,
    pub notification_queue: NotificationQueue,
    pub rate_limiter: RateLimiter,
    pub auth: AuthState,
    pub max_resume_bytes: usize,
}

impl AppState {
    /// Must be called inside a tokio runtime; it starts the notification worker.
    pub fn new(config: &Config, store: Arc<dyn CandidateStore>, http_client: Client) -> Self {
        let mailer: Option<Arc<dyn EmailSender>> = match &config.resend_api_key {
            Some(key) => Some(Arc::new(ResendMailer::new(
                http_client.clone(),
                key.clone(),
                config.email_api_url.clone(),
                config.email_from.clone(),
            ))),
            None => {
                tracing::warn!("RESEND_API_KEY not set, candidate emails are disabled");
                None
            }
        };

        let scoring_service = ScoringService::new(http_client, config);
        let notification_service = NotificationService::new(store.clone(), mailer);
        let notification_queue =
            spawn_notification_worker(notification_service.clone(), NOTIFICATION_QUEUE_CAPACITY);
        let rate_limiter =
            RateLimiter::in_memory(config.rate_limit_max_requests, config.rate_limit_window());

        Self {
            store,
            scoring_service,
            notification_service,
            notification_queue,
            rate_limiter,
            auth: AuthState::new(&config.jwt_secret),
            max_resume_bytes: config.max_resume_bytes,
        }
    }
}

pub fn build_http_client(config: &Config) -> error::Result<Client> {
    Client::builder()
        .timeout(config.http_timeout())
        .build()
        .map_err(error::Error::from)
}
