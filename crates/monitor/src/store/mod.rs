//! Persistence for samples, service state and alert settings.
//!
//! Everything above this module talks to the [`Database`] trait; the libsql
//! implementation lives in [`repository`].

pub mod migrations;
pub mod pool;
pub mod repository;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::alerts::AlertConfig;
use crate::types::Sample;

pub use repository::LibsqlDatabase;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Query(#[from] libsql::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool::managed::PoolError<libsql::Error>),

    #[error("failed to build connection pool: {0}")]
    Build(#[from] deadpool::managed::BuildError),

    #[error("failed to encode stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Database trait for abstracting storage operations
#[async_trait]
pub trait Database: Send + Sync {
    /// Append one probe result
    async fn save_sample(&self, sample: &Sample) -> Result<(), StoreError>;

    /// Newest samples for a service, newest first.
    ///
    /// Nothing in the server reads history yet; this is the read side used to check
    /// what the scheduler and the admin actions persisted.
    async fn recent_samples(&self, service_key: &str, limit: usize)
    -> Result<Vec<Sample>, StoreError>;

    /// Delete failed samples taken at or after `since`, returning how many went
    async fn delete_failures_since(&self, since: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn set_service_disabled(&self, service_key: &str, disabled: bool)
    -> Result<(), StoreError>;

    /// Disabled flag for every service that has ever been toggled
    async fn load_disabled_states(&self) -> Result<HashMap<String, bool>, StoreError>;

    /// `None` until the configuration has been saved once
    async fn load_alert_config(&self) -> Result<Option<AlertConfig>, StoreError>;

    async fn save_alert_config(&self, config: &AlertConfig) -> Result<(), StoreError>;
}
