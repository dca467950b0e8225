use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

/// Reserved request headroom for the core API quota.
const CORE_BUFFER: u32 = 100;
/// The search quota window is only 30 requests, so its buffer is smaller.
const SEARCH_BUFFER: u32 = 5;

/// Tracks remaining GitHub quota from `x-ratelimit-*` response headers and
/// proactively waits out the reset window before the quota is exhausted.
///
/// Shared across concurrent tasks; readers racing on the quota check is
/// acceptable (worst case a transient over-rate, handled by retry).
pub struct RateLimiter {
    state: Arc<Mutex<QuotaState>>,
}

struct QuotaState {
    remaining: u32,
    limit: u32,
    reset_at: Option<Instant>,
}

impl QuotaState {
    fn buffer(&self) -> u32 {
        if self.limit <= CORE_BUFFER {
            SEARCH_BUFFER
        } else {
            CORE_BUFFER
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QuotaState {
                remaining: 5000,
                limit: 5000,
                reset_at: None,
            })),
        }
    }

    /// Block until there is quota headroom above the reserved buffer.
    pub async fn ensure_quota(&self) {
        let wait_duration = {
            let state = self.state.lock().await;
            if state.remaining >= state.buffer() {
                return;
            }
            match state.reset_at {
                Some(reset_at) => {
                    let wait = reset_at.saturating_duration_since(Instant::now());
                    if wait.is_zero() {
                        return;
                    }
                    wait
                }
                None => return,
            }
        };

        tracing::info!("Quota low, waiting {:?} for rate limit reset", wait_duration);
        sleep(wait_duration + Duration::from_secs(1)).await;

        let mut state = self.state.lock().await;
        state.remaining = state.limit.max(1);
        state.reset_at = None;
    }

    /// Record the quota headers from a response.
    pub async fn record(&self, headers: &HeaderMap) {
        let remaining = header_u64(headers, "x-ratelimit-remaining");
        let limit = header_u64(headers, "x-ratelimit-limit");
        let reset = header_u64(headers, "x-ratelimit-reset");

        let Some(remaining) = remaining else {
            return;
        };

        let mut state = self.state.lock().await;
        state.remaining = remaining as u32;
        if let Some(limit) = limit {
            state.limit = limit as u32;
        }
        if let Some(reset_timestamp) = reset {
            let now_secs = chrono::Utc::now().timestamp() as u64;
            if reset_timestamp > now_secs {
                state.reset_at =
                    Some(Instant::now() + Duration::from_secs(reset_timestamp - now_secs));
            }
        }
    }

    /// Seconds until the quota window resets, for error reporting.
    pub async fn seconds_until_reset(&self) -> u64 {
        let state = self.state.lock().await;
        match state.reset_at {
            Some(reset_at) => {
                let wait = reset_at.saturating_duration_since(Instant::now());
                if wait.is_zero() {
                    0
                } else {
                    wait.as_secs() + 1
                }
            }
            None => 0,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[tokio::test]
    async fn test_record_updates_remaining() {
        let limiter = RateLimiter::new();
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4200"));
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        limiter.record(&headers).await;

        let state = limiter.state.lock().await;
        assert_eq!(state.remaining, 4200);
        assert_eq!(state.limit, 5000);
    }

    #[tokio::test]
    async fn test_ensure_quota_passes_with_headroom() {
        let limiter = RateLimiter::new();
        // Fresh limiter starts at full quota; must not block.
        limiter.ensure_quota().await;
    }

    #[tokio::test]
    async fn test_search_quota_uses_small_buffer() {
        let limiter = RateLimiter::new();
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("10"));
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("30"));
        limiter.record(&headers).await;

        // 10 remaining of a 30 window is above the search buffer of 5, so
        // this must return immediately rather than waiting for reset.
        limiter.ensure_quota().await;
    }
}
