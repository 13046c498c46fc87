//! Shared application state.
use std::sync::{Arc, Mutex};
use std::time::Instant;

use pipeline::BatchPipeline;

use crate::config::ServiceConfig;

/// State shared across request handlers.
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub pipeline: Arc<BatchPipeline>,
    limiter: Mutex<TokenBucket>,
}

/// Token bucket: `rate_limit` tokens per second, capped at `rate_burst`.
/// Refilled lazily on each admission check.
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl AppState {
    pub fn new(config: Arc<ServiceConfig>, pipeline: Arc<BatchPipeline>) -> Self {
        let limiter = Mutex::new(TokenBucket {
            tokens: config.rate_burst as f64,
            last_refill: Instant::now(),
        });
        Self {
            config,
            pipeline,
            limiter,
        }
    }

    /// Admission check for one request. Every request-handling endpoint
    /// consumes one token; a dry bucket means 429.
    pub fn allow_request(&self) -> bool {
        let mut bucket = self
            .limiter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.rate_limit as f64)
            .min(self.config.rate_burst as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
