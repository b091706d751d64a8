use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{fmt, fs};

use serde::{Deserialize, Serialize};
use servicarr_guard::session::MIN_SECRET_LEN;
use servicarr_monitor::ServiceDefinition;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },

    #[error("AUTH_SECRET must be at least 32 bytes (use a long random string)")]
    WeakSecret,

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("failed to serialize services: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Longest accepted session lifetime, 400 days.
const MAX_SESSION_AGE_SECS: i64 = 400 * 24 * 3600;

/// Runtime configuration, read from the environment
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub auth_user: String,
    pub password_sha256: [u8; 32],
    pub auth_secret: String,
    pub insecure_dev: bool,
    pub session_max_age_secs: i64,
    pub poll_interval: Duration,
    pub db_path: PathBuf,
    pub enable_scheduler: bool,
    pub degraded_threshold_ms: u64,
    pub services_file: PathBuf,
    pub alert_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let password_sha256 = match (get("AUTH_PASSWORD_SHA256"), get("AUTH_PASSWORD")) {
            (Some(hash), _) => decode_sha256(&hash)?,
            (None, Some(password)) => sha256(password.as_bytes()),
            (None, None) => return Err(ConfigError::Missing("AUTH_PASSWORD or AUTH_PASSWORD_SHA256")),
        };

        let auth_secret = get("AUTH_SECRET").ok_or(ConfigError::Missing("AUTH_SECRET"))?;
        if auth_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let session_max_age_secs = parse_or(&get, "SESSION_MAX_AGE_SECONDS", 86_400_i64)?;
        if session_max_age_secs <= 0 {
            return Err(invalid("SESSION_MAX_AGE_SECONDS", session_max_age_secs, "must be positive"));
        }
        if session_max_age_secs > MAX_SESSION_AGE_SECS {
            return Err(invalid(
                "SESSION_MAX_AGE_SECONDS",
                session_max_age_secs,
                "must not exceed 400 days",
            ));
        }

        let poll_secs = parse_or(&get, "POLL_SECONDS", 60_u64)?;
        if poll_secs == 0 {
            return Err(invalid("POLL_SECONDS", poll_secs, "must be positive"));
        }

        Ok(Self {
            bind: parse_or(&get, "BIND", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&get, "PORT", 4555)?,
            auth_user: get("AUTH_USER").unwrap_or_else(|| "admin".to_owned()),
            password_sha256,
            auth_secret,
            insecure_dev: flag(&get, "INSECURE_DEV", false)?,
            session_max_age_secs,
            poll_interval: Duration::from_secs(poll_secs),
            db_path: get("DB_PATH").map_or_else(|| PathBuf::from("./uptime.db"), PathBuf::from),
            enable_scheduler: flag(&get, "ENABLE_SCHEDULER", true)?,
            degraded_threshold_ms: parse_or(&get, "DEGRADED_THRESHOLD_MS", 200)?,
            services_file: get("SERVICES_FILE")
                .map_or_else(|| PathBuf::from("./services.toml"), PathBuf::from),
            alert_webhook_url: get("ALERT_WEBHOOK_URL"),
        })
    }
}

fn invalid(key: &'static str, value: impl fmt::Display, reason: &str) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason: reason.to_owned() }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        None => Ok(default),
    }
}

fn flag(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(invalid(key, other, "expected true or false")),
    }
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(bytes));
    digest
}

fn decode_sha256(hex_digest: &str) -> Result<[u8; 32], ConfigError> {
    let mut digest = [0u8; 32];
    hex::decode_to_slice(hex_digest, &mut digest)
        .map_err(|e| invalid("AUTH_PASSWORD_SHA256", "<redacted>", &e.to_string()))?;
    Ok(digest)
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("auth_user", &self.auth_user)
            .field("password_sha256", &"<redacted>")
            .field("auth_secret", &"<redacted>")
            .field("insecure_dev", &self.insecure_dev)
            .field("session_max_age_secs", &self.session_max_age_secs)
            .field("poll_interval", &self.poll_interval)
            .field("db_path", &self.db_path)
            .field("enable_scheduler", &self.enable_scheduler)
            .field("degraded_threshold_ms", &self.degraded_threshold_ms)
            .field("services_file", &self.services_file)
            .field("alert_webhook_url", &self.alert_webhook_url.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_1 = write_indented(1);
        let on_off = |enabled: bool| if enabled { "on" } else { "off" };

        writeln!(f, "Servicarr configuration:")?;
        write_1(f, "Listen", &format!("{}:{}", self.bind, self.port))?;
        write_1(f, "Admin user", &self.auth_user)?;
        write_1(f, "Insecure cookies", &on_off(self.insecure_dev))?;
        write_1(f, "Session lifetime", &format!("{}s", self.session_max_age_secs))?;
        write_1(f, "Scheduler", &on_off(self.enable_scheduler))?;
        write_1(f, "Poll interval", &format!("{}s", self.poll_interval.as_secs()))?;
        write_1(f, "Degraded above", &format!("{}ms", self.degraded_threshold_ms))?;
        write_1(f, "Database", &self.db_path.display())?;
        write_1(f, "Services file", &self.services_file.display())?;
        write_1(f, "Alert transport", &if self.alert_webhook_url.is_some() { "webhook" } else { "log" })?;

        Ok(())
    }
}

/// Services declared in the services file, one `[[service]]` table each
#[derive(Debug, Serialize, Deserialize)]
pub struct ServicesFile {
    #[serde(rename = "service", default)]
    pub services: Vec<ServiceDefinition>,
}

impl Default for ServicesFile {
    fn default() -> Self {
        let service = |key: &str, label: &str, endpoint: &str, timeout_secs: u64| ServiceDefinition {
            key: key.to_owned(),
            label: label.to_owned(),
            endpoint: endpoint.to_owned(),
            timeout_secs,
            ok_min: 200,
            ok_max: 399,
        };

        Self {
            services: vec![
                service("server", "Server", "tcp://10.0.0.2:22", 4),
                service("plex", "Plex", "http://10.0.0.2:32400/identity", 5),
                service("overseerr", "Overseerr", "http://10.0.0.2:5055/api/v1/status", 4),
            ],
        }
    }
}

impl ServicesFile {
    /// Read the services file, writing the default one first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let raw = fs::read_to_string(path)
                .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
            toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })
        } else {
            let services = Self::default();
            services.write(path)?;
            tracing::info!(path = %path.display(), "wrote default services file");
            Ok(services)
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write { path: path.to_owned(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, raw).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("AUTH_PASSWORD", "hunter2"), ("AUTH_SECRET", SECRET)]))
                .unwrap();

        assert_eq!(config.port, 4555);
        assert_eq!(config.auth_user, "admin");
        assert_eq!(config.password_sha256, sha256(b"hunter2"));
        assert!(!config.insecure_dev);
        assert!(config.enable_scheduler);
        assert_eq!(config.session_max_age_secs, 86_400);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.degraded_threshold_ms, 200);
        assert!(config.alert_webhook_url.is_none());
    }

    #[test]
    fn test_overrides_and_prehashed_password() {
        let digest = hex::encode(Sha256::digest(b"s3cret"));
        let config = Config::from_lookup(lookup(&[
            ("AUTH_PASSWORD_SHA256", digest.as_str()),
            ("AUTH_PASSWORD", "ignored"),
            ("AUTH_SECRET", SECRET),
            ("PORT", "8080"),
            ("BIND", "127.0.0.1"),
            ("INSECURE_DEV", "yes"),
            ("ENABLE_SCHEDULER", "false"),
            ("POLL_SECONDS", "15"),
            ("ALERT_WEBHOOK_URL", "https://hooks.example/alert"),
        ]))
        .unwrap();

        assert_eq!(config.password_sha256, sha256(b"s3cret"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind, IpAddr::from([127, 0, 0, 1]));
        assert!(config.insecure_dev);
        assert!(!config.enable_scheduler);
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.alert_webhook_url.as_deref(), Some("https://hooks.example/alert"));
    }

    #[test]
    fn test_rejects_missing_and_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("AUTH_SECRET", SECRET)])),
            Err(ConfigError::Missing(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("AUTH_PASSWORD", "pw"), ("AUTH_SECRET", "short")])),
            Err(ConfigError::WeakSecret)
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[
                ("AUTH_PASSWORD", "pw"),
                ("AUTH_SECRET", SECRET),
                ("PORT", "http"),
            ])),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[
                ("AUTH_PASSWORD", "pw"),
                ("AUTH_SECRET", SECRET),
                ("INSECURE_DEV", "maybe"),
            ])),
            Err(ConfigError::Invalid { key: "INSECURE_DEV", .. })
        ));
    }

    #[test]
    fn test_session_lifetime_is_bounded() {
        let with_age = |age: &'static str| {
            Config::from_lookup(lookup(&[
                ("AUTH_PASSWORD", "pw"),
                ("AUTH_SECRET", SECRET),
                ("SESSION_MAX_AGE_SECONDS", age),
            ]))
        };

        assert!(matches!(
            with_age("10000000000000"),
            Err(ConfigError::Invalid { key: "SESSION_MAX_AGE_SECONDS", .. })
        ));
        assert!(matches!(
            with_age("0"),
            Err(ConfigError::Invalid { key: "SESSION_MAX_AGE_SECONDS", .. })
        ));
        assert_eq!(with_age("34560000").unwrap().session_max_age_secs, 34_560_000);
    }

    #[test]
    fn test_secrets_are_not_printed() {
        let config =
            Config::from_lookup(lookup(&[("AUTH_PASSWORD", "hunter2"), ("AUTH_SECRET", SECRET)]))
                .unwrap();

        let debug = format!("{config:?}");
        let display = config.to_string();
        assert!(!debug.contains(SECRET));
        assert!(!display.contains(SECRET));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_services_file_written_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("services.toml");

        let created = ServicesFile::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.services.len(), 3);

        let reread = ServicesFile::load_or_create(&path).unwrap();
        assert_eq!(reread.services, created.services);
    }

    #[test]
    fn test_services_file_parses_tables_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.toml");
        fs::write(
            &path,
            r#"
[[service]]
key = "web"
label = "Website"
endpoint = "https://example.com/health"

[[service]]
key = "ssh"
label = "SSH"
endpoint = "tcp://10.0.0.2:22"
timeout_secs = 2
"#,
        )
        .unwrap();

        let file = ServicesFile::load_or_create(&path).unwrap();

        assert_eq!(file.services.len(), 2);
        assert_eq!(file.services[0].timeout_secs, 5);
        assert_eq!(file.services[1].timeout_secs, 2);
        assert_eq!(file.services[1].ok_max, 399);
    }
}
