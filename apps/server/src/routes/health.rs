use actix_web::{HttpResponse, Responder, get, web};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_route);
}

/// Liveness probe. The status code is the whole answer.
#[get("/health")]
pub async fn health_route() -> impl Responder {
    HttpResponse::Ok()
}
