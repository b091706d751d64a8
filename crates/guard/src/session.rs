//! Stateless signed login sessions.
//!
//! A session value is `b64url(payload) "." b64url(HMAC-SHA256(payload))` where the
//! payload is `{"u":"<username>","exp":<unix seconds>}`. Nothing is kept server side;
//! the only way to revoke every session is to restart with a new secret.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed session.
pub const SESSION_COOKIE: &str = "sess";

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("malformed session value")]
    Malformed,
    #[error("session signature mismatch")]
    BadSignature,
    #[error("session expired")]
    Expired,
    #[error("session lifetime out of range")]
    LifetimeOutOfRange,
}

/// Decoded session payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "u")]
    pub username: String,
    /// Unix timestamp (seconds) after which the session is rejected
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Issues and verifies session values with a process-wide secret.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Build a signer. Secrets shorter than [`MIN_SECRET_LEN`] are refused.
    pub fn new(secret: &[u8]) -> Result<Self, SessionError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::WeakSecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SessionError::WeakSecret)?;
        Ok(Self { mac })
    }

    /// Mint a session for `username` valid for `ttl` from now.
    pub fn issue(&self, username: &str, ttl: Duration) -> Result<String, SessionError> {
        self.issue_at(username, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        username: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let expires_at = now.checked_add_signed(ttl).ok_or(SessionError::LifetimeOutOfRange)?;
        let payload = serde_json::json!({
            "u": username,
            "exp": expires_at.timestamp(),
        })
        .to_string();

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let tag = mac.finalize().into_bytes();

        Ok(format!("{}.{}", URL_SAFE_NO_PAD.encode(payload), URL_SAFE_NO_PAD.encode(tag)))
    }

    /// Check a session value against the current time.
    pub fn verify(&self, value: &str) -> Result<Session, SessionError> {
        self.verify_at(value, Utc::now())
    }

    /// Signature is checked before the payload is parsed, so a forged payload is
    /// never interpreted.
    pub fn verify_at(&self, value: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
        let (encoded_payload, encoded_tag) =
            value.split_once('.').ok_or(SessionError::Malformed)?;
        if encoded_tag.contains('.') {
            return Err(SessionError::Malformed);
        }

        let payload =
            URL_SAFE_NO_PAD.decode(encoded_payload).map_err(|_| SessionError::Malformed)?;
        let tag = URL_SAFE_NO_PAD.decode(encoded_tag).map_err(|_| SessionError::BadSignature)?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        mac.verify_slice(&tag).map_err(|_| SessionError::BadSignature)?;

        let session: Session =
            serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;
        if now.timestamp() > session.expires_at {
            return Err(SessionError::Expired);
        }

        Ok(session)
    }
}
