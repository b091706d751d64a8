use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;

/// Endpoints with this prefix are probed with a bare TCP connect.
pub const TCP_SCHEME: &str = "tcp://";

/// Type of monitoring check to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    Http,
    Tcp,
}

impl CheckType {
    /// Split an endpoint into its check type and the target handed to the checker.
    pub fn from_endpoint(endpoint: &str) -> (Self, &str) {
        match endpoint.strip_prefix(TCP_SCHEME) {
            Some(addr) => (Self::Tcp, addr),
            None => (Self::Http, endpoint),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("TCP connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Checker trait for different types of monitoring checks
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Perform the check and return the protocol status code, if the protocol has one
    async fn check(&self, target: &str, timeout: Duration) -> Result<Option<u16>, ProbeError>;
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    /// Probes go straight to the service; environment proxies are ignored.
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("servicarr/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(ProbeError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, target: &str, timeout: Duration) -> Result<Option<u16>, ProbeError> {
        // Resolves once response headers arrive; the body is never read
        let response = self.client.get(target).timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() { ProbeError::Timeout(timeout) } else { ProbeError::Http(e) }
        })?;

        Ok(Some(response.status().as_u16()))
    }
}

/// TCP port checker
pub struct TcpChecker;

#[async_trait::async_trait]
impl Checker for TcpChecker {
    async fn check(&self, target: &str, timeout_duration: Duration) -> Result<Option<u16>, ProbeError> {
        let stream = timeout(timeout_duration, tokio::net::TcpStream::connect(target))
            .await
            .map_err(|_| ProbeError::Timeout(timeout_duration))?
            .map_err(ProbeError::Connect)?;
        drop(stream);

        Ok(None)
    }
}

/// Result of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub ok: bool,
    /// HTTP status, 0 for TCP probes and failed requests
    pub status_code: u16,
    /// Time until the response headers, the connect, or the failure
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn is_degraded(&self, threshold_ms: u64) -> bool {
        self.ok && self.latency_ms > threshold_ms
    }
}

/// Runs one health check. Failures are reported in the outcome, never raised.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn run(&self, endpoint: &str, timeout: Duration, min_ok: u16, max_ok: u16)
    -> ProbeOutcome;
}

/// Probe backed by real TCP and HTTP checkers.
pub struct NetworkProbe {
    http_checker: HttpChecker,
    tcp_checker: TcpChecker,
}

impl NetworkProbe {
    pub fn new() -> Result<Self, ProbeError> {
        Ok(Self { http_checker: HttpChecker::new()?, tcp_checker: TcpChecker })
    }
}

#[async_trait::async_trait]
impl Probe for NetworkProbe {
    async fn run(
        &self,
        endpoint: &str,
        timeout: Duration,
        min_ok: u16,
        max_ok: u16,
    ) -> ProbeOutcome {
        let (check_type, target) = CheckType::from_endpoint(endpoint);
        let checker: &dyn Checker = match check_type {
            CheckType::Http => &self.http_checker,
            CheckType::Tcp => &self.tcp_checker,
        };

        let start = Instant::now();
        let result = checker.check(target, timeout).await;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(None) => ProbeOutcome { ok: true, status_code: 0, latency_ms, error: None },
            Ok(Some(status_code)) => {
                let ok = (min_ok..=max_ok).contains(&status_code);
                let error = (!ok).then(|| {
                    format!("status {status_code} outside accepted range {min_ok}-{max_ok}")
                });
                ProbeOutcome { ok, status_code, latency_ms, error }
            }
            Err(e) => {
                tracing::warn!(endpoint, latency_ms, error = %e, "probe failed");
                ProbeOutcome { ok: false, status_code: 0, latency_ms, error: Some(e.to_string()) }
            }
        }
    }
}
