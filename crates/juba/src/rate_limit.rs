//! Per-client request budget for the public browse routes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::RateLimitConfig;

/// Token buckets keyed by client address.
pub struct BrowseLimiter {
    buckets: DefaultKeyedRateLimiter<IpAddr>,
    trust_forwarded_for: bool,
}

impl BrowseLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: RateLimiter::keyed(Quota::per_minute(config.per_minute)),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// Spend one request from `client`'s budget. False once it is exhausted.
    pub fn admit(&self, client: IpAddr) -> bool {
        self.buckets.check_key(&client).is_ok()
    }

    /// Drop buckets that have refilled completely.
    pub fn prune(&self) {
        self.buckets.retain_recent();
        self.buckets.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Socket peer, or the first `x-forwarded-for` hop when the deployment
    /// sits behind a trusted proxy. Requests with neither share one bucket.
    fn client_ip(&self, request: &Request) -> IpAddr {
        let forwarded = self
            .trust_forwarded_for
            .then(|| {
                request
                    .headers()
                    .get("x-forwarded-for")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|raw| raw.split(',').next())
                    .and_then(|first| first.trim().parse().ok())
            })
            .flatten();

        forwarded
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

pub fn browse_limiter(config: &RateLimitConfig) -> Arc<BrowseLimiter> {
    Arc::new(BrowseLimiter::new(config))
}

/// Prune idle buckets every `every` until the returned task is aborted.
pub fn spawn_pruning(limiter: Arc<BrowseLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            limiter.prune();
            debug!(clients = limiter.tracked_clients(), "pruned browse limiter");
        }
    })
}

/// Middleware rejecting callers that spent their budget with 429.
pub async fn enforce(
    State(limiter): State<Arc<BrowseLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = limiter.client_ip(&request);
    if !limiter.admit(client) {
        debug!(client = %client, path = %request.uri().path(), "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "too many requests" })),
        )
            .into_response();
    }
    next.run(request).await
}
