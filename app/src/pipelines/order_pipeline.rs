// storefront/app/src/pipelines/order_pipeline.rs

//! Operator order placement: one order per (user, address, promocode),
//! linked to the selected part of the catalog in a single transaction.

use shopflow::{Ctx, Outcome, Pipeline, Step, Workflows};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::models::NewOrder;
use crate::pipelines::contexts::{OrderRequest, PlaceOrderCtxData};
use crate::storage::{OrderUpsert, ProductFilter, Store};

pub fn build() -> AppResult<Pipeline<PlaceOrderCtxData, AppError>> {
  let mut p = Pipeline::with_steps(
    "place_order",
    &[
      ("resolve_user", false),
      ("select_products", false),
      ("upsert_order", false),
    ],
  )?;
  p.on("resolve_user", resolve_user)?;
  p.on("select_products", select_products)?;
  p.on("upsert_order", upsert_order)?;
  Ok(p)
}

#[instrument(name = "workflow::place_order", skip(workflows, store))]
pub async fn place_order(
  workflows: &Workflows<AppError>,
  store: Arc<dyn Store>,
  request: OrderRequest,
) -> AppResult<OrderUpsert> {
  let ctx = Ctx::new(PlaceOrderCtxData {
    store,
    request,
    user: None,
    catalog: ProductFilter::by_pk(),
    result: None,
  });
  match workflows.run(ctx.clone()).await? {
    Outcome::Completed => ctx.write().result.take().ok_or(AppError::PipelineHaltedByHandler),
    Outcome::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

async fn resolve_user(ctx: Ctx<PlaceOrderCtxData>) -> AppResult<Step> {
  let (store, username) = {
    let guard = ctx.read();
    (guard.store.clone(), guard.request.username.clone())
  };
  let user = store
    .user_by_username(&username)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User '{}' not found.", username)))?;
  ctx.write().user = Some(user);
  Ok(Step::Continue)
}

/// Only describes the products; the store resolves them inside the order
/// transaction.
async fn select_products(ctx: Ctx<PlaceOrderCtxData>) -> AppResult<Step> {
  ctx.update(|data| {
    data.catalog = ProductFilter {
      name_contains: data.request.product_name.clone(),
      ..ProductFilter::by_pk()
    };
    debug!(name_contains = ?data.catalog.name_contains, "Products selected for the order.");
  });
  Ok(Step::Continue)
}

async fn upsert_order(ctx: Ctx<PlaceOrderCtxData>) -> AppResult<Step> {
  let (store, draft, catalog) = {
    let guard = ctx.read();
    let user_id = guard
      .user
      .as_ref()
      .map(|u| u.id)
      .ok_or_else(|| AppError::Internal("Order step ran before the user was resolved.".to_string()))?;
    (
      guard.store.clone(),
      NewOrder {
        delivery_address: guard.request.delivery_address.clone(),
        promocode: guard.request.promocode.clone(),
        user_id,
        product_ids: Vec::new(),
        receipt: None,
      },
      guard.catalog.clone(),
    )
  };
  let upsert = store.get_or_create_order(draft, Some(&catalog)).await?;
  info!(order_id = upsert.order.id, created = upsert.created, "Order placed.");
  ctx.write().result = Some(upsert);
  Ok(Step::Continue)
}
