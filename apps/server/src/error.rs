use std::io::Error as IoError;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde_json::json;
use servicarr_guard::SessionError;
use servicarr_monitor::{AlertError, ProbeError, RegistryError, StoreError};
use thiserror::Error;

use crate::config::ConfigError;

pub const BLOCKED_MESSAGE: &str =
    "Your access has been temporarily blocked due to excessive failed login attempts";

/// Failures that stop the server from starting
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Service registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
    #[error("Session signer error: {0}")]
    Session(#[from] SessionError),
    #[error("Probe setup error: {0}")]
    Probe(#[from] ProbeError),
    #[error("Alert transport error: {0}")]
    Alert(#[from] AlertError),
}

/// Errors returned by request handlers and guards
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("too many requests")]
    RateLimited,

    #[error("access blocked until {expires_at}")]
    Blocked { expires_at: DateTime<Utc> },

    #[error("bad request")]
    BadRequest,

    #[error("unknown service")]
    UnknownService,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("alerts not configured or disabled")]
    AlertsDisabled,

    #[error("Failed to send test alert: {0}")]
    AlertDelivery(AlertError),
}

impl From<AlertError> for ApiError {
    fn from(err: AlertError) -> Self {
        match err {
            AlertError::Disabled => Self::AlertsDisabled,
            other => Self::AlertDelivery(other),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::Blocked { .. } => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest | Self::AlertsDisabled => StatusCode::BAD_REQUEST,
            Self::UnknownService => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Session(_) | Self::AlertDelivery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Unauthorized => json!({ "error": "unauthorized" }),
            Self::Forbidden => json!({ "error": "forbidden" }),
            Self::RateLimited => json!({ "error": "rate_limited" }),
            Self::Blocked { expires_at } => json!({
                "error": "access_blocked",
                "message": BLOCKED_MESSAGE,
                "expires_at": expires_at,
            }),
            Self::BadRequest => json!({ "error": "bad_request" }),
            Self::UnknownService => json!({ "error": "unknown_service" }),
            Self::Storage(e) => {
                tracing::error!(error = %e, "storage failure while handling request");
                json!({ "error": "server_error" })
            }
            Self::Session(e) => {
                tracing::error!(error = %e, "failed to issue session");
                json!({ "error": "server_error" })
            }
            Self::AlertsDisabled | Self::AlertDelivery(_) => {
                json!({ "success": false, "message": self.to_string() })
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_guard_errors_are_minimal() {
        let (status, body) = body_json(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "unauthorized" }));

        let (status, body) = body_json(ApiError::RateLimited).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "rate_limited");

        let (status, body) =
            body_json(ApiError::Storage(StoreError::Corrupt("row 7".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("row 7"));

        let (status, body) = body_json(SessionError::LifetimeOutOfRange.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "server_error" }));
    }

    #[actix_web::test]
    async fn test_blocked_carries_expiry() {
        let expires_at = Utc::now();
        let (status, body) = body_json(ApiError::Blocked { expires_at }).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "access_blocked");
        assert_eq!(body["message"], BLOCKED_MESSAGE);
        assert_eq!(body["expires_at"], json!(expires_at));
    }

    #[actix_web::test]
    async fn test_alert_errors_map_by_kind() {
        let (status, body) = body_json(AlertError::Disabled.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "alerts not configured or disabled");

        let (status, body) = body_json(AlertError::Rejected(502).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("502"));
    }
}
