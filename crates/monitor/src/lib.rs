//! Monitoring engine for Servicarr.
//!
//! This crate is responsible for:
//! - Probing services over raw TCP or HTTP
//! - Sweeping every enabled service on a fixed interval
//! - Turning consecutive results into state transitions and alerts
//! - Persisting samples, service state and alert settings

pub mod alerts;
pub mod checker;
pub mod scheduler;
pub mod services;
pub mod store;
pub mod types;

pub use alerts::{AlertConfig, AlertDispatcher, AlertError, Notifier};
pub use checker::{NetworkProbe, Probe, ProbeError, ProbeOutcome};
pub use scheduler::{Scheduler, SchedulerConfig, probe_service};
pub use services::{RegistryError, Service, ServiceDefinition, ServiceRegistry};
pub use store::{Database, LibsqlDatabase, StoreError};
pub use types::{HealthState, LivePayload, LiveResult, Sample};
