use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod leave;
mod model;
mod models;
mod routes;
mod state;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::leave::accrual::current_period;
use crate::state::AppState;
use crate::store::{MemoryStore, MySqlStore, Store};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Leave management API"
}

/// Runs the current period's accrual on a fixed interval. Each run is
/// idempotent, so overlapping a month boundary is harmless.
fn spawn_accrual_scheduler(state: Data<AppState>, every: Duration) {
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let period = current_period();
            match state.accrual.run_monthly_accrual(period).await {
                Ok(report) => info!(
                    %period,
                    credited = report.credited,
                    failures = report.failures.len(),
                    "Scheduled accrual run"
                ),
                Err(e) => error!(%period, error = %e, "Scheduled accrual failed"),
            }
        }
    });
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await?;
            info!("Using MySQL store");
            Arc::new(MySqlStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Data::new(AppState::new(config.clone(), store));
    state.ensure_bootstrap_admin().await?;

    if let Some(secs) = config.accrual_interval_secs {
        info!(secs, "Scheduled accrual enabled");
        spawn_accrual_scheduler(state.clone(), Duration::from_secs(secs));
    }

    let server_addr = config.server_addr.clone();
    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(state.clone())
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests;
