use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest, web};
use futures::future::{Ready, ready};
use servicarr_guard::client_ip;
use servicarr_guard::csrf::{self, CSRF_COOKIE, CSRF_HEADER};
use servicarr_guard::session::SESSION_COOKIE;

use crate::error::ApiError;
use crate::state::AppState;

/// Client address as resolved by the request guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequest for ClientIp {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let ip = req.extensions().get::<ClientIp>().cloned().unwrap_or_else(|| {
            let forwarded_for = req
                .headers()
                .get("X-Forwarded-For")
                .and_then(|value| value.to_str().ok());
            ClientIp(client_ip::resolve(forwarded_for, req.peer_addr()))
        });
        ready(Ok(ip))
    }
}

/// Proof of a valid admin session, plus a matching CSRF token on writes.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
}

impl AdminSession {
    /// Session check alone, without CSRF. Used by read-only identity probes.
    pub fn from_cookie(req: &HttpRequest, state: &AppState) -> Option<Self> {
        let cookie = req.cookie(SESSION_COOKIE)?;
        let session = state.sessions.verify(cookie.value()).ok()?;
        Some(Self { username: session.username })
    }

    fn authorize(req: &HttpRequest) -> Result<Self, ApiError> {
        let state = req.app_data::<web::Data<AppState>>().ok_or(ApiError::Unauthorized)?;
        let admin = Self::from_cookie(req, state).ok_or(ApiError::Unauthorized)?;

        if csrf::requires_token(req.method().as_str()) {
            let cookie = req.cookie(CSRF_COOKIE);
            let header = req.headers().get(CSRF_HEADER).and_then(|v| v.to_str().ok());
            if !csrf::verify(cookie.as_ref().map(|c| c.value()), header) {
                return Err(ApiError::Forbidden);
            }
        }

        Ok(admin)
    }
}

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::authorize(req))
    }
}
