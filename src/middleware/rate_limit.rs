use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::error::Error;

/// Expired entries are swept once the table grows past this size.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

/// Fixed-window counter keyed by client. Swap the in-memory store for a
/// shared one to run more than one instance.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn try_acquire(&self, key: &str, limit: u32, window: Duration) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

/// Process-local counters; lost on restart and not shared between instances.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, key: &str) -> Option<u32> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).map(|e| e.count)
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn try_acquire(&self, key: &str, limit: u32, window: Duration) -> RateDecision {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if guard.len() > SWEEP_THRESHOLD {
            guard.retain(|_, e| now.duration_since(e.window_start) < window);
        }

        let entry = guard.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= window {
            entry.count = 1;
            entry.window_start = now;
            return RateDecision::Allowed {
                remaining: limit.saturating_sub(1),
            };
        }

        if entry.count >= limit {
            let left = window.saturating_sub(elapsed).as_secs_f64().ceil() as u64;
            return RateDecision::Limited {
                retry_after_secs: left.max(1),
            };
        }

        entry.count += 1;
        RateDecision::Allowed {
            remaining: limit - entry.count,
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, limit: u32, window: Duration) -> Self {
        Self {
            store,
            limit: limit.max(1),
            window,
        }
    }

    pub fn in_memory(limit: u32, window: Duration) -> Self {
        Self::new(Arc::new(MemoryCounterStore::new()), limit, window)
    }

    pub async fn check(&self, key: &str) -> RateDecision {
        self.store.try_acquire(key, self.limit, self.window).await
    }
}

/// Forwarded IP, then real IP, then a fingerprint of browser headers.
pub fn client_key(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return ip.to_string();
    }
    if let Some(ip) = header("x-real-ip") {
        return ip.to_string();
    }

    let user_agent = header("user-agent").unwrap_or_default();
    let accept_language = header("accept-language").unwrap_or_default();
    let digest = Sha256::digest(format!("{}{}", user_agent, accept_language).as_bytes());
    format!("unknown-{}", hex::encode(&digest[..8]))
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(req.headers());
    match limiter.check(&key).await {
        RateDecision::Allowed { remaining } => {
            tracing::debug!(remaining, "rate limit check passed");
            next.run(req).await
        }
        RateDecision::Limited { retry_after_secs } => {
            let shown: String = key.chars().take(10).collect();
            tracing::warn!(client = %shown, retry_after_secs, "rate limit exceeded");
            Error::RateLimited { retry_after_secs }.into_response()
        }
    }
}
