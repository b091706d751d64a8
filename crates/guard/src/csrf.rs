//! Double-submit CSRF tokens.
//!
//! The token is handed out in a script-readable cookie and must come back in the
//! [`CSRF_HEADER`] header. A cross-site page cannot read the cookie, so it cannot
//! forge the header.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use subtle::ConstantTimeEq;

pub const CSRF_COOKIE: &str = "csrf";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

const TOKEN_BYTES: usize = 32;

/// Fresh random token, base64url encoded.
pub fn issue_token() -> String {
    let mut raw = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// True only when both values are present, non-empty and byte-equal.
pub fn verify(cookie: Option<&str>, header: Option<&str>) -> bool {
    match (cookie, header) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && !header.is_empty() => {
            cookie.as_bytes().ct_eq(header.as_bytes()).into()
        }
        _ => false,
    }
}

/// Read-only methods skip CSRF verification.
pub fn requires_token(method: &str) -> bool {
    !matches!(method, "GET" | "HEAD" | "OPTIONS")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_random_and_url_safe() {
        let first = issue_token();
        let second = issue_token();

        assert_ne!(first, second);
        assert_eq!(URL_SAFE_NO_PAD.decode(&first).unwrap().len(), TOKEN_BYTES);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_verify_requires_both_sides() {
        let token = issue_token();

        assert!(verify(Some(&token), Some(&token)));
        assert!(!verify(Some(&token), None));
        assert!(!verify(None, Some(&token)));
        assert!(!verify(None, None));
        assert!(!verify(Some(""), Some("")));
        assert!(!verify(Some(&token), Some(&issue_token())));
        assert!(!verify(Some(&token), Some(&token[..token.len() - 1])));
    }

    #[test]
    fn test_read_only_methods_bypass() {
        for method in ["GET", "HEAD", "OPTIONS"] {
            assert!(!requires_token(method));
        }
        for method in ["POST", "PUT", "PATCH", "DELETE"] {
            assert!(requires_token(method));
        }
    }
}
