use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use deadpool::managed::{Object, PoolConfig};
use libsql::{Value, params};

use super::migrations::run_migrations;
use super::pool::{ConnectionManager, ConnectionPool};
use super::{Database, StoreError};
use crate::alerts::AlertConfig;
use crate::types::Sample;

const POOL_SIZE: usize = 8;

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

/// LibSQL database implementation
pub struct LibsqlDatabase {
    pool: ConnectionPool,
}

impl LibsqlDatabase {
    /// Open (or create) the database file and bring its schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let database = libsql::Builder::new_local(path.as_ref()).build().await?;
        let pool = ConnectionPool::builder(ConnectionManager::new(database))
            .config(PoolConfig::new(POOL_SIZE))
            .build()?;

        let db = Self { pool };
        let conn = db.get_conn().await?;
        run_migrations(&conn).await?;
        drop(conn);

        tracing::info!(path = %path.as_ref().display(), "database ready");
        Ok(db)
    }

    async fn get_conn(&self) -> Result<Object<ConnectionManager>, StoreError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Database for LibsqlDatabase {
    async fn save_sample(&self, sample: &Sample) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        let latency = match sample.latency_ms {
            Some(ms) => Value::Integer(i64::try_from(ms).unwrap_or(i64::MAX)),
            None => Value::Null,
        };

        conn.execute(
            "INSERT INTO samples (taken_at, service_key, ok, http_status, latency_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                encode_time(sample.taken_at),
                sample.service_key.as_str(),
                i64::from(sample.ok),
                i64::from(sample.http_status),
                latency
            ],
        )
        .await?;

        Ok(())
    }

    async fn recent_samples(
        &self,
        service_key: &str,
        limit: usize,
    ) -> Result<Vec<Sample>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT taken_at, service_key, ok, http_status, latency_ms FROM samples
                 WHERE service_key = ?1 ORDER BY taken_at DESC, id DESC LIMIT ?2",
                params![service_key, i64::try_from(limit).unwrap_or(i64::MAX)],
            )
            .await?;

        let mut samples = Vec::new();
        while let Some(row) = rows.next().await? {
            let taken_at: String = row.get(0)?;
            let http_status: i64 = row.get(3)?;
            let latency_ms = match row.get_value(4)? {
                Value::Integer(ms) => u64::try_from(ms).ok(),
                Value::Null => None,
                other => return Err(StoreError::Corrupt(format!("latency_ms: {other:?}"))),
            };

            samples.push(Sample {
                taken_at: decode_time(&taken_at)?,
                service_key: row.get(1)?,
                ok: row.get::<i64>(2)? != 0,
                http_status: u16::try_from(http_status)
                    .map_err(|_| StoreError::Corrupt(format!("http_status: {http_status}")))?,
                latency_ms,
            });
        }

        Ok(samples)
    }

    async fn delete_failures_since(&self, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM samples WHERE ok = 0 AND taken_at >= ?1",
                params![encode_time(since)],
            )
            .await?;

        Ok(deleted)
    }

    async fn set_service_disabled(
        &self,
        service_key: &str,
        disabled: bool,
    ) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO service_state (service_key, disabled, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(service_key) DO UPDATE
             SET disabled = excluded.disabled, updated_at = excluded.updated_at",
            params![service_key, i64::from(disabled), encode_time(Utc::now())],
        )
        .await?;

        Ok(())
    }

    async fn load_disabled_states(&self) -> Result<HashMap<String, bool>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query("SELECT service_key, disabled FROM service_state", ()).await?;

        let mut states = HashMap::new();
        while let Some(row) = rows.next().await? {
            states.insert(row.get::<String>(0)?, row.get::<i64>(1)? != 0);
        }

        Ok(states)
    }

    async fn load_alert_config(&self) -> Result<Option<AlertConfig>, StoreError> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query("SELECT config FROM alert_config WHERE id = 1", ()).await?;

        match rows.next().await? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn save_alert_config(&self, config: &AlertConfig) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        let raw = serde_json::to_string(config)?;

        conn.execute(
            "INSERT INTO alert_config (id, config, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET config = excluded.config, updated_at = excluded.updated_at",
            params![raw, encode_time(Utc::now())],
        )
        .await?;

        Ok(())
    }
}
