//! Per-client token buckets.
//!
//! Buckets refill lazily: every admission check adds one token per whole second
//! elapsed since the last refill, capped at [`BUCKET_CAPACITY`]. There is no timer
//! per bucket; [`RateLimiter::evict_idle`] is driven by the server's janitor.

use std::time::{Duration, Instant};

use dashmap::DashMap;

pub const BUCKET_CAPACITY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited,
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&self, ip: &str) -> Admission {
        self.admit_at(ip, Instant::now())
    }

    pub fn admit_at(&self, ip: &str, now: Instant) -> Admission {
        let mut bucket = self
            .buckets
            .entry(ip.to_owned())
            .or_insert(Bucket { tokens: BUCKET_CAPACITY, last_refill: now });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs();
        if elapsed > 0 {
            let refill = u32::try_from(elapsed).unwrap_or(u32::MAX);
            bucket.tokens = bucket.tokens.saturating_add(refill).min(BUCKET_CAPACITY);
            bucket.last_refill = now;
        }

        if bucket.tokens == 0 {
            return Admission::Limited;
        }
        bucket.tokens -= 1;
        Admission::Allowed
    }

    /// Drop buckets that have not refilled for `idle`.
    ///
    /// With `idle` of at least [`BUCKET_CAPACITY`] seconds an evicted bucket would
    /// have been full again, so eviction never changes an admission decision.
    pub fn evict_idle(&self, idle: Duration, now: Instant) -> usize {
        let mut evicted = 0;
        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_duration_since(bucket.last_refill) < idle;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[cfg(test)]
    fn tokens(&self, ip: &str) -> Option<u32> {
        self.buckets.get(ip).map(|bucket| bucket.tokens)
    }
}
