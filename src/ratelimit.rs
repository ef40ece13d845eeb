//! Fixed-window admission control per client address.
//!
//! Each `(scope, address)` pair keeps the timestamps of its recent admitted
//! requests. A check counts the timestamps inside the window and either
//! records a new one or rejects. A background sweep drops pairs whose
//! timestamps have all aged out. The sweep never forgets a timestamp that
//! is still inside the window it was admitted under.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use tokio::task::JoinHandle;

use crate::ManuscryptError;

pub const DEFAULT_MAX_REQUESTS: usize = 20;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Address key used when the peer address is not known.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    /// Window of the most recent check on this key.
    window: Duration,
    timestamps: VecDeque<Instant>,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    log: Mutex<HashMap<String, Entry>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admit or reject one request from `client` on endpoint `scope`.
    pub fn check(&self, scope: &str, client: &str, policy: RatePolicy) -> Result<(), ManuscryptError> {
        self.check_at(scope, client, policy, Instant::now())
    }

    pub fn check_at(
        &self,
        scope: &str,
        client: &str,
        policy: RatePolicy,
        now: Instant,
    ) -> Result<(), ManuscryptError> {
        let mut log = self.log();
        let entry = log.entry(format!("{scope}:{client}")).or_default();
        entry.window = policy.window;
        let timestamps = &mut entry.timestamps;

        // Timestamps at or after the window start still count.
        if let Some(window_start) = now.checked_sub(policy.window) {
            while timestamps.front().is_some_and(|t| *t < window_start) {
                timestamps.pop_front();
            }
        }

        if timestamps.len() >= policy.max_requests {
            let retry_after = timestamps
                .front()
                .map(|oldest| policy.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(policy.window);
            tracing::info!(scope, client, "Rate limit exceeded");
            return Err(ManuscryptError::RateLimited {
                retry_after_secs: retry_after.as_secs_f64().ceil().max(1.0) as u64,
            });
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// Forget timestamps older than `retention` or the entry's own window,
    /// whichever is longer, and drop entries left empty.
    /// Returns the number of removed entries.
    pub fn prune(&self, now: Instant, retention: Duration) -> usize {
        let mut log = self.log();
        let before = log.len();
        log.retain(|_, entry| {
            let keep_for = retention.max(entry.window);
            entry
                .timestamps
                .retain(|t| now.saturating_duration_since(*t) < keep_for);
            !entry.timestamps.is_empty()
        });
        before - log.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.log().len()
    }

    /// Sweep every `every`, independent of request handling.
    pub fn spawn_housekeeping(self: Arc<Self>, every: Duration, retention: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.prune(Instant::now(), retention);
                if removed > 0 {
                    tracing::debug!(removed, "Pruned idle rate-limit entries");
                }
            }
        })
    }
}

/// Resolve the address a request is counted against.
///
/// The socket peer is authoritative. `X-Forwarded-For` is only read when
/// the peer is the configured trusted proxy, and then only its right-most
/// entry (the address the proxy itself saw).
pub fn client_address(
    peer: Option<SocketAddr>,
    headers: &HeaderMap,
    trusted_proxy: Option<IpAddr>,
) -> String {
    let Some(peer) = peer else {
        return UNKNOWN_CLIENT.to_string();
    };
    if trusted_proxy == Some(peer.ip()) {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .map(str::trim)
            .and_then(|v| v.parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.ip().to_string()
}
