use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checker::ProbeOutcome;

/// Classified health of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unknown,
    Up,
    Degraded,
    Down,
}

impl HealthState {
    pub fn classify(ok: bool, degraded: bool) -> Self {
        match (ok, degraded) {
            (false, _) => HealthState::Down,
            (true, true) => HealthState::Degraded,
            (true, false) => HealthState::Up,
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Up => write!(f, "up"),
            HealthState::Down => write!(f, "down"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Unknown => write!(f, "unknown"),
        }
    }
}

/// One persisted probe result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub taken_at: DateTime<Utc>,
    pub service_key: String,
    pub ok: bool,

    /// HTTP status code, 0 for TCP probes and failed requests
    pub http_status: u16,

    /// Response time in milliseconds
    pub latency_ms: Option<u64>,
}

impl Sample {
    pub fn from_outcome(service_key: &str, outcome: &ProbeOutcome, taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            service_key: service_key.to_owned(),
            ok: outcome.ok,
            http_status: outcome.status_code,
            latency_ms: Some(outcome.latency_ms),
        }
    }
}

/// Live status of one service as served by the public status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveResult {
    pub label: String,
    pub ok: bool,
    pub status: u16,
    #[serde(rename = "ms", skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub disabled: bool,
    pub degraded: bool,
}

impl LiveResult {
    /// Entry for a service that was not probed because monitoring is off.
    pub fn disabled(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            ok: false,
            status: 0,
            latency_ms: None,
            disabled: true,
            degraded: false,
        }
    }

    pub fn from_outcome(label: &str, outcome: &ProbeOutcome, degraded_threshold_ms: u64) -> Self {
        Self {
            label: label.to_owned(),
            ok: outcome.ok,
            status: outcome.status_code,
            latency_ms: Some(outcome.latency_ms),
            disabled: false,
            degraded: outcome.is_degraded(degraded_threshold_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LivePayload {
    pub t: DateTime<Utc>,
    pub status: BTreeMap<String, LiveResult>,
}
