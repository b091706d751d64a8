use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::alerts::{AlertDispatcher, AlertTracker, Transition};
use crate::checker::{Probe, ProbeOutcome};
use crate::services::{Service, ServiceRegistry};
use crate::store::Database;
use crate::types::Sample;

pub const DEFAULT_DEGRADED_THRESHOLD_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the starts of two sweeps
    pub interval: Duration,
    pub degraded_threshold_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            degraded_threshold_ms: DEFAULT_DEGRADED_THRESHOLD_MS,
        }
    }
}

/// Probe one service with its own timeout and accepted status range.
pub async fn probe_service(probe: &dyn Probe, service: &Service) -> ProbeOutcome {
    probe.run(&service.endpoint, service.timeout, service.ok_min, service.ok_max).await
}

/// Periodic sweep over every enabled service
pub struct Scheduler {
    registry: ServiceRegistry,
    probe: Arc<dyn Probe>,
    database: Arc<dyn Database>,
    dispatcher: Arc<AlertDispatcher>,
    tracker: AlertTracker,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        registry: ServiceRegistry,
        probe: Arc<dyn Probe>,
        database: Arc<dyn Database>,
        dispatcher: Arc<AlertDispatcher>,
        config: SchedulerConfig,
    ) -> Self {
        Self { registry, probe, database, dispatcher, tracker: AlertTracker::new(), config }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sweep on every tick until `shutdown` turns true or its sender goes away.
    ///
    /// The first sweep starts immediately. A sweep that outlasts the interval
    /// delays the next one instead of triggering a burst.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval(self.config.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?self.config.interval, services = self.registry.len(), "scheduler started");

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = timer.tick() => {
                    self.sweep().await;
                }
            }
        }

        info!("scheduler stopped");
    }

    /// Probe every enabled service once, in registry order.
    ///
    /// Storage errors are logged and the sweep moves on to the next service.
    pub async fn sweep(&mut self) -> Vec<Transition> {
        let taken_at = Utc::now();
        let registry = self.registry.clone();
        let mut transitions = Vec::new();

        for service in registry.iter() {
            // Read per service so a toggle mid-sweep applies to the ones not yet visited
            if service.is_disabled() {
                debug!(service = %service.key, "monitoring disabled, skipping");
                continue;
            }

            let outcome = probe_service(self.probe.as_ref(), service).await;
            let sample = Sample::from_outcome(&service.key, &outcome, taken_at);
            if let Err(e) = self.database.save_sample(&sample).await {
                error!(service = %service.key, error = %e, "failed to save sample");
            }

            let degraded = outcome.is_degraded(self.config.degraded_threshold_ms);
            if let Some(transition) = self.tracker.observe(&service.key, outcome.ok, degraded) {
                info!(
                    service = %service.key,
                    from = %transition.from,
                    to = %transition.to,
                    "service state changed"
                );
                self.dispatcher.dispatch(&transition, &service.label).await;
                transitions.push(transition);
            }
        }

        debug!(transitions = transitions.len(), "sweep finished");
        transitions
    }
}
