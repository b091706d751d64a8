use actix_web::{HttpResponse, get, post, web};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use servicarr_monitor::{AlertConfig, LiveResult, Sample, probe_service};
use tracing::{error, info};

use crate::error::ApiError;
use crate::extract::AdminSession;
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .service(ingest_now_route)
            .service(reset_recent_route)
            .service(check_route)
            .service(toggle_monitoring_route)
            .service(blocks_route)
            .service(unblock_route)
            .service(clear_blocks_route)
            .service(get_alert_config_route)
            .service(save_alert_config_route)
            .service(test_alert_route),
    );
}

#[derive(Debug, Deserialize)]
pub struct ServiceKeyRequest {
    #[serde(default)]
    pub service: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub service: String,
    pub enable: bool,
}

#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    #[serde(default)]
    pub ip: String,
}

/// Probe every enabled service now and persist the samples. No alerts are raised.
#[post("/ingest-now")]
pub async fn ingest_now_route(
    admin: AdminSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    for service in state.registry.iter().filter(|service| !service.is_disabled()) {
        let outcome = probe_service(state.probe.as_ref(), service).await;
        state.database.save_sample(&Sample::from_outcome(&service.key, &outcome, now)).await?;
    }

    info!(user = %admin.username, "manual sweep saved");
    Ok(HttpResponse::Ok().json(json!({ "saved": true, "t": now })))
}

/// Delete failed samples from the last 24 hours.
#[post("/reset-recent")]
pub async fn reset_recent_route(
    admin: AdminSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let deleted = state.database.delete_failures_since(Utc::now() - Duration::hours(24)).await?;

    info!(user = %admin.username, deleted, "recent incidents reset");
    Ok(HttpResponse::Ok().json(json!({ "deleted_recent_incidents": true })))
}

/// Probe a single service and persist the sample.
#[post("/check")]
pub async fn check_route(
    _admin: AdminSession,
    state: web::Data<AppState>,
    body: web::Json<ServiceKeyRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.service.is_empty() {
        return Err(ApiError::BadRequest);
    }
    let service = state.registry.get(&body.service).ok_or(ApiError::UnknownService)?;

    if service.is_disabled() {
        return Ok(HttpResponse::Ok().json(LiveResult::disabled(&service.label)));
    }

    let outcome = probe_service(state.probe.as_ref(), service).await;
    state
        .database
        .save_sample(&Sample::from_outcome(&service.key, &outcome, Utc::now()))
        .await?;

    Ok(HttpResponse::Ok().json(LiveResult::from_outcome(
        &service.label,
        &outcome,
        state.degraded_threshold_ms,
    )))
}

/// Enable or disable monitoring. The new state is persisted before it takes effect.
#[post("/toggle-monitoring")]
pub async fn toggle_monitoring_route(
    admin: AdminSession,
    state: web::Data<AppState>,
    body: web::Json<ToggleRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.service.is_empty() {
        return Err(ApiError::BadRequest);
    }
    if state.registry.get(&body.service).is_none() {
        return Err(ApiError::UnknownService);
    }

    let disabled = !body.enable;
    state.database.set_service_disabled(&body.service, disabled).await?;
    state.registry.set_disabled(&body.service, disabled);

    info!(user = %admin.username, service = %body.service, enabled = body.enable, "monitoring toggled");
    Ok(HttpResponse::Ok().json(json!({ "service": body.service, "enabled": body.enable })))
}

#[get("/blocks")]
pub async fn blocks_route(_admin: AdminSession, state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "blocks": state.brute_force.list() }))
}

#[post("/unblock")]
pub async fn unblock_route(
    admin: AdminSession,
    state: web::Data<AppState>,
    body: web::Json<UnblockRequest>,
) -> Result<HttpResponse, ApiError> {
    let ip = body.ip.trim();
    if ip.is_empty() {
        return Err(ApiError::BadRequest);
    }

    state.brute_force.clear(ip);
    info!(user = %admin.username, %ip, "address unblocked");
    Ok(HttpResponse::Ok().json(json!({ "unblocked": ip })))
}

#[post("/clear-blocks")]
pub async fn clear_blocks_route(admin: AdminSession, state: web::Data<AppState>) -> HttpResponse {
    let cleared = state.brute_force.clear_all();

    info!(user = %admin.username, cleared, "all blocks cleared");
    HttpResponse::Ok().json(json!({
        "message": format!("Successfully cleared {cleared} IP blocks"),
        "cleared": cleared,
    }))
}

#[get("/alerts/config")]
pub async fn get_alert_config_route(
    _admin: AdminSession,
    state: web::Data<AppState>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.dispatcher.config().await)
}

/// Persist the alert settings, then apply them.
#[post("/alerts/config")]
pub async fn save_alert_config_route(
    admin: AdminSession,
    state: web::Data<AppState>,
    body: web::Json<AlertConfig>,
) -> Result<HttpResponse, ApiError> {
    let config = body.into_inner();
    state.database.save_alert_config(&config).await?;
    state.dispatcher.set_config(config).await;

    info!(user = %admin.username, "alert configuration saved");
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Configuration saved successfully",
    })))
}

/// Send a test notification and report the delivery result.
#[post("/alerts/test")]
pub async fn test_alert_route(
    _admin: AdminSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let recipient = state.dispatcher.send_test().await.inspect_err(|e| {
        error!(error = %e, "test alert failed");
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Test alert sent successfully to {recipient}"),
    })))
}
