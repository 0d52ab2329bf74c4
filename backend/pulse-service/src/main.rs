use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;

use pulse_service::background::{shutdown_background_tasks, spawn_background_tasks};
use pulse_service::config::Config;
use pulse_service::logging::init_tracing;
use pulse_service::routes;
use pulse_service::services::{AnalyticsStore, ClickHouseAnalyticsStore, Pipeline};
use pulse_service::state::AppState;

#[actix_web::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("Starting pulse-service");

    let config = Config::from_env().context("Failed to load configuration")?;

    let store = ClickHouseAnalyticsStore::new(&config.clickhouse);
    if let Err(e) = store.ensure_schema().await {
        // Per-event inserts fail until ClickHouse is reachable
        tracing::warn!("Failed to ensure product activity table: {}", e);
    }
    let store: Arc<dyn AnalyticsStore> = Arc::new(store);

    let pipeline = Arc::new(Pipeline::new(&config, store));
    let tasks = spawn_background_tasks(&config.kafka, &pipeline)
        .context("Failed to start background tasks")?;

    let state = web::Data::new(AppState::new(pipeline.registry.clone()));
    let port = config.port;

    tracing::info!("Starting HTTP server on 0.0.0.0:{}", port);

    let server_result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error");

    shutdown_background_tasks(tasks, &pipeline).await;

    server_result
}
