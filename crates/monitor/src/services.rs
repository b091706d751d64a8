//! Monitored services and their shared disabled flags.
//!
//! The registry is built once at startup and never resized. The only mutable
//! part of a [`Service`] is its disabled flag, which admin handlers write and
//! both the scheduler and the status endpoint read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checker::TCP_SCHEME;

const MAX_TIMEOUT_SECS: u64 = 300;

fn default_timeout_secs() -> u64 {
    5
}

fn default_ok_min() -> u16 {
    200
}

fn default_ok_max() -> u16 {
    399
}

/// Service as declared in the services file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub key: String,
    pub label: String,
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_ok_min")]
    pub ok_min: u16,
    #[serde(default = "default_ok_max")]
    pub ok_max: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("service key must be non-empty and use only letters, digits, '-' or '_': {0:?}")]
    InvalidKey(String),

    #[error("duplicate service key: {0}")]
    DuplicateKey(String),

    #[error("service {key}: {reason}")]
    InvalidEndpoint { key: String, reason: String },

    #[error("service {key}: accepted status range {min}-{max} is empty")]
    InvalidStatusRange { key: String, min: u16, max: u16 },

    #[error("service {key}: timeout must be between 1 and 300 seconds")]
    InvalidTimeout { key: String },
}

#[derive(Debug)]
pub struct Service {
    pub key: String,
    pub label: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub ok_min: u16,
    pub ok_max: u16,
    disabled: AtomicBool,
}

impl Service {
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
    }
}

impl TryFrom<ServiceDefinition> for Service {
    type Error = RegistryError;

    fn try_from(def: ServiceDefinition) -> Result<Self, Self::Error> {
        let valid_key = !def.key.is_empty()
            && def.key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_key {
            return Err(RegistryError::InvalidKey(def.key));
        }

        validate_endpoint(&def.endpoint).map_err(|reason| RegistryError::InvalidEndpoint {
            key: def.key.clone(),
            reason: reason.to_owned(),
        })?;

        if def.ok_min > def.ok_max {
            return Err(RegistryError::InvalidStatusRange {
                key: def.key,
                min: def.ok_min,
                max: def.ok_max,
            });
        }

        if def.timeout_secs == 0 || def.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(RegistryError::InvalidTimeout { key: def.key });
        }

        let label = if def.label.trim().is_empty() { def.key.clone() } else { def.label };

        Ok(Self {
            key: def.key,
            label,
            endpoint: def.endpoint,
            timeout: Duration::from_secs(def.timeout_secs),
            ok_min: def.ok_min,
            ok_max: def.ok_max,
            disabled: AtomicBool::new(false),
        })
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), &'static str> {
    if let Some(target) = endpoint.strip_prefix(TCP_SCHEME) {
        // Expected format: host:port
        let (host, port) = target.rsplit_once(':').ok_or("TCP target must be host:port")?;
        if host.is_empty() {
            return Err("TCP target is missing a host");
        }
        port.parse::<u16>().map_err(|_| "TCP target has an invalid port")?;
        return Ok(());
    }

    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(())
    } else {
        Err("endpoint must start with http://, https:// or tcp://")
    }
}

/// Ordered, fixed set of monitored services
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<Vec<Arc<Service>>>,
}

impl ServiceRegistry {
    pub fn new(definitions: Vec<ServiceDefinition>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut services = Vec::with_capacity(definitions.len());

        for def in definitions {
            if !seen.insert(def.key.clone()) {
                return Err(RegistryError::DuplicateKey(def.key));
            }
            services.push(Arc::new(Service::try_from(def)?));
        }

        Ok(Self { services: Arc::new(services) })
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Service>> {
        self.services.iter().find(|service| service.key == key)
    }

    /// Services in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Service>> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Returns false for unknown keys.
    pub fn set_disabled(&self, key: &str, disabled: bool) -> bool {
        match self.get(key) {
            Some(service) => {
                service.set_disabled(disabled);
                true
            }
            None => false,
        }
    }

    /// Apply persisted flags; keys that are no longer configured are ignored.
    pub fn apply_disabled_states(&self, states: &HashMap<String, bool>) {
        for (key, disabled) in states {
            if !self.set_disabled(key, *disabled) {
                tracing::debug!(service = %key, "ignoring stored state for unconfigured service");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn definition(key: &str, endpoint: &str) -> ServiceDefinition {
        ServiceDefinition {
            key: key.to_owned(),
            label: key.to_uppercase(),
            endpoint: endpoint.to_owned(),
            timeout_secs: default_timeout_secs(),
            ok_min: default_ok_min(),
            ok_max: default_ok_max(),
        }
    }

    #[test]
    fn test_definition_defaults() {
        let def: ServiceDefinition = serde_json::from_str(
            r#"{"key":"web","label":"Website","endpoint":"https://example.com"}"#,
        )
        .unwrap();

        assert_eq!(def.timeout_secs, 5);
        assert_eq!((def.ok_min, def.ok_max), (200, 399));
    }

    #[test]
    fn test_registry_keeps_order_and_looks_up_by_key() {
        let registry = ServiceRegistry::new(vec![
            definition("web", "https://example.com"),
            definition("ssh", "tcp://10.0.0.2:22"),
        ])
        .unwrap();

        let keys: Vec<&str> = registry.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["web", "ssh"]);
        assert_eq!(registry.get("ssh").unwrap().timeout, Duration::from_secs(5));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_rejects_invalid_definitions() {
        let dup = ServiceRegistry::new(vec![
            definition("web", "https://a.example"),
            definition("web", "https://b.example"),
        ]);
        assert_eq!(dup.unwrap_err(), RegistryError::DuplicateKey("web".into()));

        let bad_key = ServiceRegistry::new(vec![definition("we b", "https://a.example")]);
        assert!(matches!(bad_key, Err(RegistryError::InvalidKey(_))));

        for endpoint in ["ftp://a.example", "tcp://nohost", "tcp://:22", "tcp://h:99999"] {
            let result = ServiceRegistry::new(vec![definition("x", endpoint)]);
            assert!(
                matches!(result, Err(RegistryError::InvalidEndpoint { .. })),
                "{endpoint}"
            );
        }

        let mut range = definition("x", "https://a.example");
        range.ok_min = 500;
        range.ok_max = 200;
        assert!(matches!(
            ServiceRegistry::new(vec![range]),
            Err(RegistryError::InvalidStatusRange { .. })
        ));

        let mut timeout = definition("x", "https://a.example");
        timeout.timeout_secs = 0;
        assert!(matches!(
            ServiceRegistry::new(vec![timeout]),
            Err(RegistryError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn test_disabled_flags_are_shared() {
        let registry = ServiceRegistry::new(vec![definition("web", "https://example.com")]).unwrap();
        let view = registry.clone();

        assert!(registry.set_disabled("web", true));
        assert!(view.get("web").unwrap().is_disabled());
        assert!(!registry.set_disabled("missing", true));

        let mut stored = HashMap::new();
        stored.insert("web".to_owned(), false);
        stored.insert("gone".to_owned(), true);
        registry.apply_disabled_states(&stored);
        assert!(!view.get("web").unwrap().is_disabled());
    }
}
