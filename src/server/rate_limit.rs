use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use super::AppState;
use crate::config::ServerConfig;

pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests from this IP, please try again later.";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Outcome of one hit against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

/// Fixed-window counter per client key.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self { Self { max, window, windows: Mutex::new(HashMap::new()) } }

    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self::new(cfg.rate_limit_max, Duration::from_secs(cfg.rate_limit_window_secs.max(1)))
    }

    pub fn window(&self) -> Duration { self.window }

    pub async fn check(&self, key: &str, now: Instant) -> RateDecision {
        let mut lock = self.windows.lock().await;
        let window = self.window;
        lock.retain(|_, w| now.duration_since(w.started) < window);
        let entry = lock.entry(key.to_string()).or_insert(Window { started: now, hits: 0 });
        entry.hits = entry.hits.saturating_add(1);
        let elapsed = now.duration_since(entry.started);
        let reset = window.saturating_sub(elapsed);
        RateDecision {
            allowed: entry.hits <= self.max,
            limit: self.max,
            remaining: self.max.saturating_sub(entry.hits),
            reset_secs: reset.as_secs() + u64::from(reset.subsec_nanos() > 0),
        }
    }
}

pub(crate) fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(addr) = peer {
        return addr.ip().to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision, window: Duration) {
    let pairs = [
        ("ratelimit-policy", format!("{};w={}", decision.limit, window.as_secs())),
        ("ratelimit-limit", decision.limit.to_string()),
        ("ratelimit-remaining", decision.remaining.to_string()),
        ("ratelimit-reset", decision.reset_secs.to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(v) = HeaderValue::from_str(&value) {
            headers.insert(name, v);
        }
    }
}

pub(crate) async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
    let key = client_key(req.headers(), peer);
    let decision = state.limiter.check(&key, Instant::now()).await;
    if !decision.allowed {
        tracing::warn!(client = %key, "rate limit exceeded");
        let mut resp = (StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS_MESSAGE).into_response();
        apply_headers(resp.headers_mut(), &decision, state.limiter.window());
        if let Ok(v) = HeaderValue::from_str(&decision.reset_secs.to_string()) {
            resp.headers_mut().insert(RETRY_AFTER, v);
        }
        return resp;
    }
    let mut resp = next.run(req).await;
    apply_headers(resp.headers_mut(), &decision, state.limiter.window());
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_max_hits_within_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check("a", t0).await.allowed);
        let second = limiter.check("a", t0).await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        let third = limiter.check("a", t0 + Duration::from_secs(1)).await;
        assert!(!third.allowed);
        assert_eq!(third.reset_secs, 59);
        assert!(limiter.check("b", t0).await.allowed);
    }

    #[tokio::test]
    async fn window_expiry_resets_count() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(limiter.check("a", t0).await.allowed);
        assert!(!limiter.check("a", t0).await.allowed);
        assert!(limiter.check("a", t0 + Duration::from_secs(10)).await.allowed);
    }

    #[test]
    fn client_key_prefers_peer_then_forwarded() {
        let mut h = HeaderMap::new();
        assert_eq!(client_key(&h, None), "unknown");
        h.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        assert_eq!(client_key(&h, None), "10.0.0.1");
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(client_key(&h, Some(peer)), "127.0.0.1");
    }
}
