// storefront/app/src/pipelines/csv_import_pipeline.rs

use shopflow::{Ctx, Outcome, Pipeline, Step, Workflows};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::models::Product;
use crate::pipelines::contexts::CsvImportCtxData;
use crate::services::csv_service;
use crate::storage::Store;

pub fn build() -> AppResult<Pipeline<CsvImportCtxData, AppError>> {
  let mut p = Pipeline::with_steps("csv_import", &[("decode_rows", false), ("insert_products", false)])?;

  p.on("decode_rows", |ctx: Ctx<CsvImportCtxData>| async move {
    let bytes = std::mem::take(&mut ctx.write().bytes);
    let parsed = csv_service::parse_products(&bytes)?;
    let empty = parsed.is_empty();
    ctx.write().parsed = parsed;
    Ok::<_, AppError>(if empty { Step::Stop } else { Step::Continue })
  })?;

  p.on("insert_products", |ctx: Ctx<CsvImportCtxData>| async move {
    let (store, parsed) = {
      let mut guard = ctx.write();
      (guard.store.clone(), std::mem::take(&mut guard.parsed))
    };
    let created = store.create_products(parsed).await?;
    ctx.write().created = created;
    Ok::<_, AppError>(Step::Continue)
  })?;

  p.after("insert_products", |ctx: Ctx<CsvImportCtxData>| async move {
    info!(created = ctx.read().created.len(), "Products imported from CSV.");
    Ok::<_, AppError>(Step::Continue)
  })?;

  Ok(p)
}

/// Imports every row of `bytes` or none of them. An upload with only a
/// header row creates nothing.
#[instrument(name = "workflow::import_products_csv", skip_all, fields(size = bytes.len()))]
pub async fn import_products(
  workflows: &Workflows<AppError>,
  store: Arc<dyn Store>,
  bytes: Vec<u8>,
) -> AppResult<Vec<Product>> {
  let ctx = Ctx::new(CsvImportCtxData {
    store,
    bytes,
    parsed: Vec::new(),
    created: Vec::new(),
  });
  match workflows.run(ctx.clone()).await? {
    Outcome::Completed | Outcome::Stopped => Ok(std::mem::take(&mut ctx.write().created)),
  }
}
