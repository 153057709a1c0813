//! Per-client rate limiting
//!
//! A keyed `governor` limiter: every client address gets a burst of
//! `RATE_LIMIT_MAX` requests that refills evenly across the window, so a
//! client that stops for a full window starts again with its whole allowance.
//! Addresses come from `tower_governor`'s key extractors.

use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{self, header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::Quota;
use tower_governor::key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor};
use tower_governor::GovernorError;

use crate::state::AppState;

/// Bucket shared by requests whose address cannot be determined
pub const UNKNOWN_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

/// How a request is mapped to a client address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKeyExtractor {
    /// `X-Forwarded-For`, `X-Real-IP`, `Forwarded`, then the peer address
    Forwarded,
    /// The peer address only
    Peer,
}

impl ClientKeyExtractor {
    pub fn new(trust_proxy: bool) -> Self {
        if trust_proxy {
            ClientKeyExtractor::Forwarded
        } else {
            ClientKeyExtractor::Peer
        }
    }
}

impl KeyExtractor for ClientKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &http::Request<T>) -> Result<Self::Key, GovernorError> {
        match self {
            ClientKeyExtractor::Forwarded => SmartIpKeyExtractor.extract(req),
            ClientKeyExtractor::Peer => PeerIpKeyExtractor.extract(req),
        }
    }
}

/// `max_requests` per `window`, all available as one burst
pub fn quota(max_requests: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
    let period = (window / burst.get()).max(Duration::from_millis(1));

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Keyed request limiter, generic over the clock so tests can drive time
#[derive(Clone)]
pub struct RateLimiter<C: Clock = DefaultClock> {
    inner: Arc<RateLimiterInner<C>>,
}

struct RateLimiterInner<C: Clock> {
    limiter: governor::RateLimiter<IpAddr, DashMapStateStore<IpAddr>, C, NoOpMiddleware<C::Instant>>,
    clock: C,
    window: Duration,
    extractor: ClientKeyExtractor,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, trust_proxy: bool) -> Self {
        Self::with_clock(max_requests, window, trust_proxy, DefaultClock::default())
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(max_requests: u32, window: Duration, trust_proxy: bool, clock: C) -> Self {
        let limiter =
            governor::RateLimiter::dashmap_with_clock(quota(max_requests, window), &clock);

        Self {
            inner: Arc::new(RateLimiterInner {
                limiter,
                clock,
                window,
                extractor: ClientKeyExtractor::new(trust_proxy),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Work out which client a request belongs to
    pub fn client_key<T>(&self, request: &http::Request<T>) -> IpAddr {
        self.inner
            .extractor
            .extract(request)
            .unwrap_or(UNKNOWN_CLIENT)
    }

    /// Count a request from `client`
    pub fn check(&self, client: &IpAddr) -> Decision {
        match self.inner.limiter.check_key(client) {
            Ok(_) => Decision::Allowed,
            Err(not_until) => Decision::Limited {
                retry_after: not_until.wait_time_from(self.inner.clock.now()),
            },
        }
    }

    /// Forget clients whose allowance has fully refilled
    pub fn prune(&self) -> usize {
        let before = self.inner.limiter.len();
        self.inner.limiter.retain_recent();
        self.inner.limiter.shrink_to_fit();
        before.saturating_sub(self.inner.limiter.len())
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.inner.limiter.len()
    }
}

impl<C> RateLimiter<C>
where
    C: Clock + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    /// Start background task that drops idle clients once per window
    pub fn start_prune_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.inner.window);

            loop {
                interval.tick().await;
                let pruned = self.prune();
                if pruned > 0 {
                    tracing::debug!(count = pruned, "Pruned idle rate-limit clients");
                }
            }
        })
    }
}

/// Middleware applying the limiter held in [`AppState`]
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let limiter = state.rate_limiter();
    let client = limiter.client_key(&request);

    match limiter.check(&client) {
        Decision::Allowed => next.run(request).await,
        Decision::Limited { retry_after } => {
            tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");

            let minutes = limiter.window().as_secs().div_ceil(60);
            let message = format!(
                "Too many requests from this IP, please try again after {} minutes",
                minutes
            );
            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);

            let mut response = (StatusCode::TOO_MANY_REQUESTS, message).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs.max(1)));
            response
        }
    }
}
