use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;
use servicarr_guard::csrf;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::extract::{AdminSession, ClientIp};
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login_route).service(logout_route).service(me_route);
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Exchange credentials for a session and a fresh CSRF token.
#[post("/api/login")]
pub async fn login_route(
    state: web::Data<AppState>,
    ClientIp(ip): ClientIp,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Some(record) = state.brute_force.check_blocked(&ip) {
        warn!(%ip, "login attempt from blocked address");
        return Err(ApiError::Blocked { expires_at: record.expires_at });
    }

    if !state.verify_credentials(&body.username, &body.password) {
        let record = state.brute_force.record_failure(&ip);
        warn!(%ip, attempts = record.attempts, blocked = record.blocked_at.is_some(), "login failed");
        return Err(ApiError::Unauthorized);
    }

    state.brute_force.record_success(&ip);
    info!(%ip, user = %body.username, "login succeeded");

    let ttl = Duration::seconds(state.cookies.max_age_secs);
    let token = state.sessions.issue(&body.username, ttl)?;

    Ok(HttpResponse::Ok()
        .cookie(state.cookies.session(token))
        .cookie(state.cookies.csrf(csrf::issue_token()))
        .json(json!({ "ok": true })))
}

/// Always succeeds, whether or not a session was present.
#[post("/api/logout")]
pub async fn logout_route(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(state.cookies.clear_session())
        .cookie(state.cookies.clear_csrf())
        .json(json!({ "ok": true }))
}

#[get("/api/me")]
pub async fn me_route(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let body = match AdminSession::from_cookie(&req, &state) {
        Some(admin) => json!({ "authenticated": true, "user": admin.username }),
        None => json!({ "authenticated": false }),
    };
    HttpResponse::Ok().json(body)
}
