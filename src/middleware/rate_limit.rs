//! Per-client fixed-window limiting for frame submission and the session API.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::{broadcast, Mutex};

use crate::config::RateLimitConfig;
use crate::response::ErrorBody;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u64,
}

/// Counts hits per client IP in windows of `window` length.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_hits: u64,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

/// Outcome of one hit, carrying what the `ratelimit-*` headers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Whole seconds until the client's window restarts.
    pub reset_after_secs: u64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs.max(1)),
            max_hits: config.max_requests,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn hit(&self, ip: IpAddr) -> Quota {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        let window = windows.entry(ip).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                hits: 0,
            };
        }

        let allowed = window.hits < self.max_hits;
        if allowed {
            window.hits += 1;
        }

        let left = self.window.saturating_sub(now.duration_since(window.started));
        Quota {
            allowed,
            limit: self.max_hits,
            remaining: self.max_hits.saturating_sub(window.hits),
            reset_after_secs: left.as_secs() + u64::from(left.subsec_nanos() > 0),
        }
    }

    /// Forgets clients whose window has expired. Returns how many were dropped.
    pub async fn prune(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
        before - windows.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !is_rate_limited_path(req.uri().path()) {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = extract_client_ip(req.headers(), peer, state.config().trust_proxy);
    let quota = state.rate_limit().hit(ip).await;

    if !quota.allowed {
        tracing::debug!(%ip, "rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody::new("RATE_LIMITED", "Too many requests", None)),
        )
            .into_response();
        let headers = response.headers_mut();
        write_quota_headers(headers, &quota);
        headers.insert("retry-after", HeaderValue::from(quota.reset_after_secs));
        return response;
    }

    let mut response = next.run(req).await;
    write_quota_headers(response.headers_mut(), &quota);
    response
}

/// Frame submission and the session API are limited; health checks and static
/// assets are not.
fn is_rate_limited_path(path: &str) -> bool {
    path == "/detect" || path.starts_with("/api/")
}

fn write_quota_headers(headers: &mut HeaderMap, quota: &Quota) {
    headers.insert("ratelimit-limit", HeaderValue::from(quota.limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(quota.remaining));
    headers.insert("ratelimit-reset", HeaderValue::from(quota.reset_after_secs));
}

/// Proxy headers are only honoured with `TRUST_PROXY`; otherwise the socket
/// peer is used. Falls back to loopback when neither is known.
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse().ok());
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        if let Some(ip) = forwarded.or(real_ip) {
            return ip;
        }
    }

    peer.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Prunes expired client windows once per window until shutdown.
pub async fn rate_limit_cleanup_loop(
    limiter: Arc<RateLimiter>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(limiter.window().max(Duration::from_secs(60)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let pruned = limiter.prune().await;
                if pruned > 0 {
                    tracing::debug!(pruned, "rate_limit_cleanup: dropped expired windows");
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
