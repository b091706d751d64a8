//! Progressive blocking of IPs that keep failing to log in.
//!
//! Each failure pushes the record's expiry to 24 hours from now, so the window is
//! rolling: three failures with less than a day between consecutive ones block the
//! address for a full day after the last one. Records whose expiry has passed are
//! purged before they are read.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Failures that turn a record into an active block.
///
/// The third failure blocks, so the fourth attempt is refused. This is stricter than
/// a `> 3` rule, which would only block on the fourth failure.
pub const BLOCK_THRESHOLD: u32 = 3;

pub const FAILED_LOGIN_REASON: &str = "Failed login attempts";

pub fn block_window() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRecord {
    pub ip: String,
    pub attempts: u32,
    pub blocked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub reason: String,
}

impl BlockRecord {
    /// Attempts-only records never block.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.blocked_at.is_some() && self.expires_at > now
    }
}

#[derive(Debug, Default)]
pub struct BruteForceGuard {
    records: DashMap<String, BlockRecord>,
}

impl BruteForceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_blocked(&self, ip: &str) -> Option<BlockRecord> {
        self.check_blocked_at(ip, Utc::now())
    }

    pub fn check_blocked_at(&self, ip: &str, now: DateTime<Utc>) -> Option<BlockRecord> {
        self.records
            .get(ip)
            .filter(|record| record.is_active(now))
            .map(|record| record.value().clone())
    }

    /// Count a failed login and return the updated record.
    pub fn record_failure(&self, ip: &str) -> BlockRecord {
        self.record_failure_at(ip, Utc::now())
    }

    pub fn record_failure_at(&self, ip: &str, now: DateTime<Utc>) -> BlockRecord {
        self.records.remove_if(ip, |_, record| record.expires_at <= now);

        let expires_at = now + block_window();
        let record = self
            .records
            .entry(ip.to_owned())
            .and_modify(|record| {
                record.attempts = record.attempts.saturating_add(1);
                if record.attempts >= BLOCK_THRESHOLD {
                    record.blocked_at = Some(now);
                }
                record.expires_at = expires_at;
                FAILED_LOGIN_REASON.clone_into(&mut record.reason);
            })
            .or_insert_with(|| BlockRecord {
                ip: ip.to_owned(),
                attempts: 1,
                blocked_at: None,
                expires_at,
                reason: FAILED_LOGIN_REASON.to_owned(),
            });

        record.value().clone()
    }

    /// Forget the failure history of `ip` after a successful login.
    ///
    /// Active blocks are left alone; only an administrator lifts those.
    pub fn record_success(&self, ip: &str) -> bool {
        self.records.remove_if(ip, |_, record| record.blocked_at.is_none()).is_some()
    }

    pub fn clear(&self, ip: &str) -> bool {
        self.records.remove(ip).is_some()
    }

    /// Remove every record and report how many there were.
    pub fn clear_all(&self) -> usize {
        let mut cleared = 0;
        self.records.retain(|_, _| {
            cleared += 1;
            false
        });
        cleared
    }

    /// Non-expired records, most recently blocked first, attempts-only records last.
    pub fn list(&self) -> Vec<BlockRecord> {
        self.list_at(Utc::now())
    }

    pub fn list_at(&self, now: DateTime<Utc>) -> Vec<BlockRecord> {
        let mut records: Vec<BlockRecord> = self
            .records
            .iter()
            .filter(|record| record.expires_at > now)
            .map(|record| record.value().clone())
            .collect();
        records.sort_by(|a, b| b.blocked_at.cmp(&a.blocked_at).then_with(|| a.ip.cmp(&b.ip)));
        records
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        self.records.retain(|_, record| {
            let keep = record.expires_at > now;
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }
}
