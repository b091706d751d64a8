use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::{DefaultHeaders, Next};
use actix_web::{Error, HttpMessage, ResponseError, web};
use servicarr_guard::client_ip;

use crate::error::ApiError;
use crate::extract::ClientIp;
use crate::routes::pages;
use crate::state::AppState;

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; \
     script-src 'self' https://cdn.jsdelivr.net; \
     style-src 'self' 'unsafe-inline'; \
     img-src 'self' data:; \
     connect-src 'self' https://cdn.jsdelivr.net; \
     font-src 'self'; \
     frame-ancestors 'none'; \
     base-uri 'self'; \
     form-action 'self'";

/// Headers attached to every response, including guard rejections.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Content-Security-Policy", CONTENT_SECURITY_POLICY))
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Permissions-Policy", "geolocation=(), microphone=(), camera=()"))
}

/// Rate limit and block check applied before routing.
///
/// The resolved client address is stored in the request extensions so handlers
/// key their guard calls on the same value.
pub async fn request_guard<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return Ok(next.call(req).await?.map_into_left_body());
    };

    let forwarded_for = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok());
    let ip = client_ip::resolve(forwarded_for, req.peer_addr());

    if !state.rate_limiter.admit(&ip).is_allowed() {
        tracing::debug!(%ip, path = req.path(), "rate limited");
        let response = ApiError::RateLimited.error_response();
        return Ok(req.into_response(response).map_into_right_body());
    }

    if let Some(record) = state.brute_force.check_blocked(&ip) {
        tracing::debug!(%ip, path = req.path(), "blocked client rejected");
        let response = if req.path().starts_with("/api/") {
            ApiError::Blocked { expires_at: record.expires_at }.error_response()
        } else {
            pages::blocked_page(&record)
        };
        return Ok(req.into_response(response).map_into_right_body());
    }

    req.extensions_mut().insert(ClientIp(ip));
    Ok(next.call(req).await?.map_into_left_body())
}
