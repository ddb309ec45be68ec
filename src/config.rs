use crate::error::{Error, Result};
use crate::services::normalizer::ConfidenceScale;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_AI_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
pub const DEFAULT_AI_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_EMAIL_FROM: &str = "ResumeScreen <onboarding@resend.dev>";
pub const DEFAULT_CALENDAR_BASE_URL: &str = "https://calendly.com/interview";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub scoring_webhook_url: Option<String>,
    pub webhook_confidence_scale: ConfidenceScale,
    pub ai_gateway_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub resend_api_key: Option<String>,
    pub email_api_url: String,
    pub email_from: String,
    pub calendar_base_url: String,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub max_resume_bytes: usize,
    pub http_timeout_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let scoring_webhook_url = get_env_opt("SCORING_WEBHOOK_URL");
        if let Some(raw) = &scoring_webhook_url {
            check_url("SCORING_WEBHOOK_URL", raw)?;
        }

        let ai_gateway_url = get_env_or("AI_GATEWAY_URL", DEFAULT_AI_GATEWAY_URL);
        check_url("AI_GATEWAY_URL", &ai_gateway_url)?;
        let email_api_url = get_env_or("EMAIL_API_URL", DEFAULT_EMAIL_API_URL);
        check_url("EMAIL_API_URL", &email_api_url)?;
        let calendar_base_url = get_env_or("CALENDAR_BASE_URL", DEFAULT_CALENDAR_BASE_URL);
        check_url("CALENDAR_BASE_URL", &calendar_base_url)?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            scoring_webhook_url,
            webhook_confidence_scale: get_env_parse_or(
                "SCORING_WEBHOOK_CONFIDENCE_SCALE",
                ConfidenceScale::Percent,
            )?,
            ai_gateway_url,
            ai_api_key: get_env_opt("AI_API_KEY"),
            ai_model: get_env_or("AI_MODEL", DEFAULT_AI_MODEL),
            resend_api_key: get_env_opt("RESEND_API_KEY"),
            email_api_url,
            email_from: get_env_or("EMAIL_FROM", DEFAULT_EMAIL_FROM),
            calendar_base_url,
            rate_limit_max_requests: get_env_parse_or("RATE_LIMIT_MAX_REQUESTS", 5)?,
            rate_limit_window_secs: get_env_parse_or("RATE_LIMIT_WINDOW_SECS", 3600)?,
            max_resume_bytes: get_env_parse_or("MAX_RESUME_BYTES", 10 * 1024 * 1024)?,
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 60)?,
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

/// Unset and blank values are both treated as absent.
fn get_env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_env_opt(name).unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

fn check_url(name: &str, raw: &str) -> Result<()> {
    url::Url::parse(raw)
        .map(|_| ())
        .map_err(|e| Error::Config(format!("Invalid URL in {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
