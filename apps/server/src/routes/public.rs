use std::collections::BTreeMap;

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use futures::future::join_all;
use servicarr_monitor::{LivePayload, LiveResult, probe_service};

use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(check_route);
}

/// Probe every service concurrently and report live results.
///
/// Nothing is persisted here. Disabled services are listed without being probed.
#[get("/api/check")]
pub async fn check_route(state: web::Data<AppState>) -> HttpResponse {
    let state = state.get_ref();
    let probes = state.registry.iter().map(|service| async move {
        let result = if service.is_disabled() {
            LiveResult::disabled(&service.label)
        } else {
            let outcome = probe_service(state.probe.as_ref(), service).await;
            LiveResult::from_outcome(&service.label, &outcome, state.degraded_threshold_ms)
        };
        (service.key.clone(), result)
    });

    let status: BTreeMap<String, LiveResult> = join_all(probes).await.into_iter().collect();

    HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(LivePayload { t: Utc::now(), status })
}
