use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::Middleware;
use crate::error::ApiResult;
use crate::types::{ApiRequest, ApiResponse};

/// Per-endpoint sliding-window limit.
#[derive(Debug, Clone, Copy)]
pub struct EndpointRateLimit {
    pub window: Duration,
    pub max_requests: u32,
}

impl EndpointRateLimit {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests,
        }
    }
}

/// Rate-limiter configuration: a default limit plus per-path overrides.
///
/// The defaults throttle the abuse-prone entry points harder than the
/// rest of the API: login at 10/min, registration, password-reset
/// requests, and OTP dispatch at 5/min, everything else at 100/min.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub default: EndpointRateLimit,
    /// Overrides keyed by path, e.g. `"/auth/login"`.
    pub per_endpoint: HashMap<String, EndpointRateLimit>,
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let per_endpoint: HashMap<String, EndpointRateLimit> = [
            ("/auth/login", EndpointRateLimit::per_minute(10)),
            ("/auth/register", EndpointRateLimit::per_minute(5)),
            ("/auth/forgot-password", EndpointRateLimit::per_minute(5)),
            ("/verify/send-otp", EndpointRateLimit::per_minute(5)),
        ]
        .into_iter()
        .map(|(path, limit)| (path.to_string(), limit))
        .collect();

        Self {
            default: EndpointRateLimit::per_minute(100),
            per_endpoint,
            enabled: true,
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_limit(mut self, window: Duration, max_requests: u32) -> Self {
        self.default = EndpointRateLimit {
            window,
            max_requests,
        };
        self
    }

    pub fn endpoint(
        mut self,
        path: impl Into<String>,
        window: Duration,
        max_requests: u32,
    ) -> Self {
        self.per_endpoint.insert(
            path.into(),
            EndpointRateLimit {
                window,
                max_requests,
            },
        );
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Process-local sliding-window rate limiter.
///
/// Counters live in this process only; running several instances behind a
/// load balancer multiplies the effective limit accordingly.
pub struct RateLimitMiddleware {
    config: RateLimitConfig,
    /// Request timestamps per `(client, path)` pair, oldest first.
    hits: Mutex<HashMap<(String, String), VecDeque<Instant>>>,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Client identity: forwarded IP headers, or one shared bucket when the
    /// deployment sets neither.
    fn client_key(req: &ApiRequest) -> String {
        req.headers
            .get("x-forwarded-for")
            .or_else(|| req.headers.get("x-real-ip"))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Record one hit; on an exhausted window, the seconds until the oldest
    /// hit expires.
    fn register_hit(&self, client: String, path: String, limit: &EndpointRateLimit) -> Option<u64> {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap();
        let bucket = hits.entry((client, path)).or_default();

        while let Some(&oldest) = bucket.front() {
            if now.duration_since(oldest) >= limit.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() as u32 >= limit.max_requests {
            let retry_after = bucket
                .front()
                .map(|&oldest| {
                    limit
                        .window
                        .as_secs()
                        .saturating_sub(now.duration_since(oldest).as_secs())
                })
                .unwrap_or_else(|| limit.window.as_secs());
            return Some(retry_after);
        }

        bucket.push_back(now);
        None
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate-limit"
    }

    async fn before_request(&self, req: &ApiRequest) -> ApiResult<Option<ApiResponse>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let limit = self
            .config
            .per_endpoint
            .get(&req.path)
            .unwrap_or(&self.config.default);

        match self.register_hit(Self::client_key(req), req.path.clone(), limit) {
            None => Ok(None),
            Some(retry_after) => Ok(Some(
                ApiResponse::json(
                    429,
                    &serde_json::json!({
                        "success": false,
                        "message": "Too many requests",
                        "retryAfter": retry_after,
                    }),
                )?
                .with_header("Retry-After", retry_after.to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;

    fn request_from(path: &str, ip: &str) -> ApiRequest {
        let mut req = ApiRequest::new(HttpMethod::Post, path);
        req.headers
            .insert("x-forwarded-for".to_string(), ip.to_string());
        req
    }

    fn limiter(max_requests: u32) -> RateLimitMiddleware {
        RateLimitMiddleware::new(
            RateLimitConfig::new().default_limit(Duration::from_secs(60), max_requests),
        )
    }

    #[tokio::test]
    async fn requests_inside_the_window_pass() {
        let mw = limiter(5);
        let req = request_from("/auth/login", "1.2.3.4");
        for _ in 0..5 {
            assert!(mw.before_request(&req).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn exhausted_window_answers_429_with_retry_after() {
        let mw = limiter(3);
        let req = request_from("/auth/login", "1.2.3.4");
        for _ in 0..3 {
            assert!(mw.before_request(&req).await.unwrap().is_none());
        }

        let resp = mw.before_request(&req).await.unwrap().unwrap();
        assert_eq!(resp.status, 429);
        assert!(resp.headers.contains_key("Retry-After"));
    }

    #[tokio::test]
    async fn buckets_are_per_client() {
        let mw = limiter(2);
        let first = request_from("/auth/login", "1.1.1.1");
        let second = request_from("/auth/login", "2.2.2.2");

        for _ in 0..2 {
            assert!(mw.before_request(&first).await.unwrap().is_none());
        }
        assert!(mw.before_request(&first).await.unwrap().is_some());

        // A different address still has a fresh window.
        assert!(mw.before_request(&second).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn per_endpoint_override_beats_the_default() {
        let mw = RateLimitMiddleware::new(
            RateLimitConfig::new()
                .default_limit(Duration::from_secs(60), 100)
                .endpoint("/auth/login", Duration::from_secs(60), 2),
        );
        let req = request_from("/auth/login", "1.2.3.4");

        for _ in 0..2 {
            assert!(mw.before_request(&req).await.unwrap().is_none());
        }
        assert!(mw.before_request(&req).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn disabled_limiter_never_blocks() {
        let mw = RateLimitMiddleware::new(
            RateLimitConfig::new()
                .default_limit(Duration::from_secs(60), 1)
                .enabled(false),
        );
        let req = request_from("/auth/login", "1.2.3.4");
        for _ in 0..10 {
            assert!(mw.before_request(&req).await.unwrap().is_none());
        }
    }
}
