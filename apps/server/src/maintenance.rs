use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use servicarr_guard::{BruteForceGuard, RateLimiter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How often the janitor runs, and how long a bucket may sit idle before eviction.
pub const JANITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic cleanup of the in-memory guard tables
pub struct GuardJanitor {
    rate_limiter: Arc<RateLimiter>,
    brute_force: Arc<BruteForceGuard>,
}

impl GuardJanitor {
    pub fn new(rate_limiter: Arc<RateLimiter>, brute_force: Arc<BruteForceGuard>) -> Self {
        Self { rate_limiter, brute_force }
    }

    /// Evict idle buckets and expired block records once.
    pub fn run_once(&self, now: Instant) -> (usize, usize) {
        let buckets = self.rate_limiter.evict_idle(JANITOR_INTERVAL, now);
        let blocks = self.brute_force.purge_expired(Utc::now());
        (buckets, blocks)
    }

    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(JANITOR_INTERVAL);
            // The first tick completes immediately and there is nothing to clean yet
            interval.tick().await;

            while !*shutdown.borrow() {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let (buckets, blocks) = self.run_once(Instant::now());
                        debug!(buckets, blocks, "guard janitor pass completed");
                    }
                }
            }

            info!("guard janitor stopped");
        })
    }
}
