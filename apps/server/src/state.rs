use std::sync::Arc;

use servicarr_guard::{BruteForceGuard, RateLimiter, SessionSigner};
use servicarr_monitor::{AlertDispatcher, Database, Probe, ServiceRegistry};
use subtle::ConstantTimeEq;

use crate::config::sha256;
use crate::cookies::CookiePolicy;

/// Shared state handed to every request handler.
pub struct AppState {
    pub registry: ServiceRegistry,
    pub probe: Arc<dyn Probe>,
    pub database: Arc<dyn Database>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub sessions: SessionSigner,
    pub rate_limiter: Arc<RateLimiter>,
    pub brute_force: Arc<BruteForceGuard>,
    pub cookies: CookiePolicy,
    pub auth_user: String,
    pub password_sha256: [u8; 32],
    pub degraded_threshold_ms: u64,
}

impl AppState {
    /// Constant-time check of the single admin account.
    pub fn verify_credentials(&self, username: &str, password: &str) -> bool {
        let user_ok = username.as_bytes().ct_eq(self.auth_user.as_bytes());
        let password_ok = sha256(password.as_bytes())[..].ct_eq(&self.password_sha256[..]);
        (user_ok & password_ok).into()
    }
}
