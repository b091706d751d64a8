#![warn(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use servicarr_guard::{BruteForceGuard, RateLimiter, SessionSigner};
use servicarr_monitor::alerts::{LogNotifier, WebhookNotifier};
use servicarr_monitor::{
    AlertDispatcher, Database, LibsqlDatabase, NetworkProbe, Notifier, Scheduler,
    SchedulerConfig, ServiceRegistry,
};
use tokio::sync::watch;
use tracing::{info, warn};

mod config;
mod cookies;
mod error;
mod extract;
mod maintenance;
mod middleware;
mod routes;
mod state;

use config::{Config, ServicesFile};
use cookies::CookiePolicy;
use error::AppError;
use logger::init_tracing;
use maintenance::GuardJanitor;
use state::AppState;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    info!("Starting Servicarr with configuration:\n{config}");
    if config.insecure_dev {
        warn!("INSECURE_DEV is set, cookies are sent without the Secure flag");
    }

    let services = ServicesFile::load_or_create(&config.services_file)?;
    let registry = ServiceRegistry::new(services.services)?;
    info!(count = registry.len(), file = %config.services_file.display(), "services loaded");

    let database = LibsqlDatabase::open(&config.db_path).await?;
    registry.apply_disabled_states(&database.load_disabled_states().await?);
    let alert_config = database.load_alert_config().await?.unwrap_or_default();
    let database: Arc<dyn Database> = Arc::new(database);

    let notifier: Arc<dyn Notifier> = match &config.alert_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.as_str())?),
        None => Arc::new(LogNotifier),
    };
    let dispatcher = Arc::new(AlertDispatcher::new(alert_config, notifier));
    let probe = Arc::new(NetworkProbe::new()?);

    let rate_limiter = Arc::new(RateLimiter::new());
    let brute_force = Arc::new(BruteForceGuard::new());

    let state = web::Data::new(AppState {
        registry: registry.clone(),
        probe: probe.clone(),
        database: database.clone(),
        dispatcher: dispatcher.clone(),
        sessions: SessionSigner::new(config.auth_secret.as_bytes())?,
        rate_limiter: rate_limiter.clone(),
        brute_force: brute_force.clone(),
        cookies: CookiePolicy {
            secure: !config.insecure_dev,
            max_age_secs: config.session_max_age_secs,
        },
        auth_user: config.auth_user.clone(),
        password_sha256: config.password_sha256,
        degraded_threshold_ms: config.degraded_threshold_ms,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = vec![GuardJanitor::new(rate_limiter, brute_force).spawn(shutdown_rx.clone())];

    if config.enable_scheduler {
        let scheduler = Scheduler::new(
            registry,
            probe,
            database,
            dispatcher,
            SchedulerConfig {
                interval: config.poll_interval,
                degraded_threshold_ms: config.degraded_threshold_ms,
            },
        );
        tasks.push(scheduler.spawn(shutdown_rx));
    } else {
        info!("scheduler disabled, samples are only written on demand");
    }

    let result = run_server(&config, state).await;

    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }

    result
}

async fn run_server(config: &Config, state: web::Data<AppState>) -> Result<(), AppError> {
    info!(bind = %config.bind, port = config.port, "listening");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(routes::json_config())
            .wrap(from_fn(middleware::request_guard))
            .wrap(middleware::security_headers())
            .configure(routes::routes)
    })
    .bind((config.bind, config.port))?
    .run()
    .await?;

    Ok(())
}
