// storefront/app/src/state.rs

use shopflow::Workflows;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::{MediaStorage, SessionStore, TtlCache};
use crate::storage::Store;
use crate::web::middleware::RequestCounters;

/// Shared by every handler through `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub workflows: Arc<Workflows<AppError>>,
  pub config: Arc<AppConfig>,
  pub sessions: Arc<SessionStore>,
  pub cache: Arc<TtlCache>,
  pub counters: Arc<RequestCounters>,
  pub media: MediaStorage,
  pub started_at: Instant,
}

impl AppState {
  /// Wires the services around `store` and registers every workflow.
  pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self> {
    let workflows = Arc::new(Workflows::new());
    pipelines::register_all_pipelines(&workflows)?;
    Ok(Self {
      store,
      workflows,
      sessions: Arc::new(SessionStore::new(config.session_ttl)),
      cache: Arc::new(TtlCache::new(config.export_cache_ttl)),
      counters: Arc::new(RequestCounters::default()),
      media: MediaStorage::new(config.media_root.clone()),
      config: Arc::new(config),
      started_at: Instant::now(),
    })
  }
}
