use actix_web::web;

use crate::error::ApiError;

pub mod admin;
pub mod auth;
pub mod health;
pub mod pages;
pub mod public;

const JSON_LIMIT: usize = 64 * 1024;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::routes)
        .configure(pages::routes)
        .configure(public::routes)
        .configure(auth::routes)
        .configure(admin::routes);
}

/// Malformed or oversized JSON bodies are answered with a plain 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().limit(JSON_LIMIT).error_handler(|err, req| {
        tracing::debug!(path = req.path(), error = %err, "rejected request body");
        ApiError::BadRequest.into()
    })
}
