//! Rate limiting module to prevent abuse
//!
//! Fixed-window admission control partitioned by source key (client IP).

use dashmap::DashMap;
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_MAX_TRACKED_KEYS, DEFAULT_PERMIT_LIMIT, DEFAULT_RATE_WINDOW_SECS};

/// Time source for window bookkeeping
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitBucket {
    remaining: u32,
    window_start: Instant,
}

impl RateLimitBucket {
    fn new(permits: u32, now: Instant) -> Self {
        Self {
            remaining: permits,
            window_start: now,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Fixed-window rate limiter keyed by source
pub struct FixedWindowRateLimiter {
    buckets: DashMap<String, RateLimitBucket>,
    permit_limit: u32,
    window: Duration,
    /// Maximum number of keys to track to prevent memory exhaustion
    max_tracked_keys: usize,
    clock: Arc<dyn Clock>,
}

impl Default for FixedWindowRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_PERMIT_LIMIT, Duration::from_secs(DEFAULT_RATE_WINDOW_SECS))
    }
}

impl FixedWindowRateLimiter {
    pub fn new(permit_limit: u32, window: Duration) -> Self {
        Self::with_clock(permit_limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(permit_limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            permit_limit,
            window,
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            clock,
        }
    }

    pub fn with_max_tracked_keys(mut self, max_tracked_keys: usize) -> Self {
        self.max_tracked_keys = max_tracked_keys.max(1);
        self
    }

    /// Take one permit for `source_key`, resetting the window if it has elapsed.
    /// Returns false when the key has no permits left in the current window.
    pub fn try_acquire(&self, source_key: &str) -> bool {
        let now = self.clock.now();

        if !self.buckets.contains_key(source_key) && self.buckets.len() >= self.max_tracked_keys {
            self.make_room(now);
        }

        // The entry guard serializes check-reset-decrement for this key
        let mut bucket = self
            .buckets
            .entry(source_key.to_string())
            .or_insert_with(|| RateLimitBucket::new(self.permit_limit, now));

        if bucket.expired(now, self.window) {
            *bucket = RateLimitBucket::new(self.permit_limit, now);
        }

        if bucket.remaining > 0 {
            bucket.remaining -= 1;
            true
        } else {
            false
        }
    }

    /// Permits left for a key in its current window, if it is tracked
    pub fn remaining(&self, source_key: &str) -> Option<u32> {
        let now = self.clock.now();
        self.buckets.get(source_key).map(|bucket| {
            if bucket.expired(now, self.window) {
                self.permit_limit
            } else {
                bucket.remaining
            }
        })
    }

    /// Drop buckets whose window has elapsed; returns how many were removed
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.expired(now, self.window));
        before.saturating_sub(self.buckets.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    pub fn permit_limit(&self) -> u32 {
        self.permit_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn make_room(&self, now: Instant) {
        self.buckets.retain(|_, bucket| !bucket.expired(now, self.window));
        if self.buckets.len() < self.max_tracked_keys {
            return;
        }

        let oldest = self
            .buckets
            .iter()
            .min_by_key(|entry| entry.value().window_start)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.buckets.remove(&key);
            debug!("Evicted oldest rate limit bucket to prevent memory exhaustion");
        }
    }

    /// Start periodic eviction of idle buckets
    pub fn start_cleanup_task(self: Arc<Self>, every: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let evicted = self.evict_expired();
                if evicted > 0 {
                    info!("Rate limiter sweep evicted {} idle buckets", evicted);
                }
            }
        });
    }
}
