//! Per-identity sliding window rate limiting.
//!
//! Each identity owns a queue of admitted call instants. A check prunes
//! entries older than the period, rejects when the remaining count has
//! reached the quota, and otherwise records the call. Pruning is lazy:
//! an identity's window is only touched when that identity is checked
//! (or when an operator calls [`RateLimiter::sweep_idle`]).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::security::clock::{Clock, SystemClock};

/// Quota and trailing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub quota: usize,
    pub period: Duration,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for RatePolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            quota: config.quota,
            period: Duration::from_secs(config.period_secs),
        }
    }
}

type Window = Mutex<VecDeque<Instant>>;

/// Sliding window limiter keyed by identity.
///
/// The map is sharded and every window has its own lock, so the
/// prune/check/append sequence is atomic per identity while unrelated
/// identities proceed independently.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    policy: ArcSwap<RatePolicy>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: RatePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            policy: ArcSwap::from_pointee(policy),
            clock,
        }
    }

    /// Admit iff fewer than `quota` calls remain in the trailing period.
    ///
    /// Rejected calls are not recorded.
    pub fn admit(&self, identity: &str) -> bool {
        let policy = **self.policy.load();

        if let Some(window) = self.windows.get(identity) {
            return self.try_record(&window, policy);
        }

        let window = self
            .windows
            .entry(identity.to_owned())
            .or_default()
            .downgrade();
        self.try_record(&window, policy)
    }

    fn try_record(&self, window: &Window, policy: RatePolicy) -> bool {
        let mut calls = window.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        prune(&mut calls, now, policy.period);

        if calls.len() >= policy.quota {
            return false;
        }
        calls.push_back(now);
        true
    }

    /// Calls left for `identity` in the current window, without recording one.
    pub fn remaining(&self, identity: &str) -> usize {
        let policy = **self.policy.load();
        let used = match self.windows.get(identity) {
            Some(window) => {
                let calls = window.lock().unwrap_or_else(PoisonError::into_inner);
                let now = self.clock.now();
                calls
                    .iter()
                    .filter(|&&t| now.duration_since(t) < policy.period)
                    .count()
            }
            None => 0,
        };
        policy.quota.saturating_sub(used)
    }

    /// Replace quota and period; existing windows are kept.
    pub fn set_policy(&self, policy: RatePolicy) {
        self.policy.store(Arc::new(policy));
        tracing::info!(quota = policy.quota, period = ?policy.period, "Rate limit policy updated");
    }

    pub fn policy(&self) -> RatePolicy {
        **self.policy.load()
    }

    /// Number of identities currently holding a window.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    /// Drop windows whose calls have all aged out. Returns how many were removed.
    pub fn sweep_idle(&self) -> usize {
        let policy = **self.policy.load();
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            let calls = window.get_mut().unwrap_or_else(PoisonError::into_inner);
            prune(calls, now, policy.period);
            !calls.is_empty()
        });
        before - self.windows.len()
    }
}

fn prune(calls: &mut VecDeque<Instant>, now: Instant, period: Duration) {
    while let Some(&front) = calls.front() {
        if now.duration_since(front) >= period {
            calls.pop_front();
        } else {
            break;
        }
    }
}
