// storefront/app/src/main.rs

use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use storefront_app::seed::seed_demo_data;
use storefront_app::storage::{MemoryStore, PgStore, Store};
use storefront_app::telemetry::init_tracing;
use storefront_app::web::configure_app_routes;
use storefront_app::web::middleware::{capture_user_agent, count_requests};
use storefront_app::{AppConfig, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Failed to load application configuration: {}", e);
      std::process::exit(1);
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!("Starting storefront server...");

  let store: Arc<dyn Store> = match app_config.database_url.as_deref() {
    Some(url) => match PgStore::connect(url).await {
      Ok(store) => {
        tracing::info!("Connected to the database and applied migrations.");
        Arc::new(store)
      }
      Err(e) => {
        tracing::error!(error = %e, "Failed to connect to the database.");
        std::process::exit(1);
      }
    },
    None => {
      tracing::warn!("DATABASE_URL not set, using the in-memory store.");
      Arc::new(MemoryStore::new())
    }
  };

  if app_config.seed_db {
    match seed_demo_data(store.as_ref()).await {
      Ok(true) => tracing::info!("Demo data seeded."),
      Ok(false) => {}
      Err(e) => tracing::error!(error = %e, "Failed to seed demo data."),
    }
  }

  let server_address = app_config.bind_address();
  let app_state = match AppState::new(app_config, store) {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to register workflows.");
      std::process::exit(1);
    }
  };
  tracing::info!(workflows = app_state.workflows.len(), "Workflows registered.");
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(from_fn(count_requests))
      .wrap(from_fn(capture_user_agent))
      .wrap(TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
