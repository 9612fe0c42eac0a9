// storefront/app/src/web/handlers/order_handlers.rs

//! Order pages under `/shop/orders/`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, FormErrors, Result};
use crate::models::{NewOrder, OrderDetails, OrderForm};
use crate::services::media::RECEIPTS_DIR;
use crate::state::AppState;
use crate::storage::ProductFilter;
use crate::web::extractors::RequireUser;
use crate::web::forms::{read_form, MAX_FORM_FILE_BYTES};
use crate::web::redirect;

const ORDERS_LIST_URL: &str = "/shop/orders/";
const ORDER_FORM_FIELDS: &[&str] = &["delivery_address", "promocode", "user", "products", "receipt"];

async fn load_order(state: &AppState, pk: i64) -> Result<OrderDetails> {
  state.store.get_order(pk).await?.ok_or_else(|| {
    warn!(order_id = pk, "Order not found.");
    AppError::NotFound(format!("No order found matching the query (pk={}).", pk))
  })
}

/// Parses the posted order and checks that its user and products exist.
/// An attached `receipt` file is stored only once the form is valid.
async fn read_order_form(state: &AppState, req: &HttpRequest, payload: web::Payload) -> Result<NewOrder> {
  let form = read_form(req, payload, MAX_FORM_FILE_BYTES).await?;
  let mut order = OrderForm::from_pairs(form.pairs()).into_new_order()?;

  let mut errors = FormErrors::new();
  if state.store.user_by_id(order.user_id).await?.is_none() {
    errors.add("user", "Select a valid choice. That choice is not one of the available choices.");
  }
  let known: Vec<i64> = state
    .store
    .list_products(&ProductFilter {
      ids: Some(order.product_ids.clone()),
      ..ProductFilter::default()
    })
    .await?
    .into_iter()
    .map(|p| p.id)
    .collect();
  for missing in order.product_ids.iter().filter(|id| !known.contains(*id)) {
    errors.add(
      "products",
      format!("Select a valid choice. {} is not one of the available choices.", missing),
    );
  }
  errors.into_result()?;

  if let Some(receipt) = form.file("receipt") {
    order.receipt = Some(state.media.save(RECEIPTS_DIR, &receipt.file_name, &receipt.bytes).await?);
  }
  Ok(order)
}

#[instrument(name = "handler::list_orders", skip(app_state, user), fields(user_id = user.0.id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, user: RequireUser) -> Result<HttpResponse> {
  let orders = app_state.store.list_orders().await?;
  info!(count = orders.len(), "Listing orders.");
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::order_details", skip(app_state, path), fields(order_id = *path))]
pub async fn order_details_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let order = load_order(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

pub async fn create_order_form_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "form": { "fields": ORDER_FORM_FIELDS } }))
}

#[instrument(name = "handler::create_order", skip_all)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let order = read_order_form(&app_state, &req, payload).await?;
  let created = app_state.store.create_order(order).await?;
  info!(order_id = created.id, "Order created.");
  Ok(redirect(ORDERS_LIST_URL))
}

pub async fn update_order_form_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let order = load_order(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "order": order,
    "form": { "fields": ORDER_FORM_FIELDS },
  })))
}

#[instrument(name = "handler::update_order", skip(app_state, req, payload, path), fields(order_id = *path))]
pub async fn update_order_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Payload,
  path: web::Path<i64>,
) -> Result<HttpResponse> {
  let pk = path.into_inner();
  load_order(&app_state, pk).await?;
  let order = read_order_form(&app_state, &req, payload).await?;
  app_state
    .store
    .update_order(pk, order)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No order found matching the query (pk={}).", pk)))?;
  info!(order_id = pk, "Order updated.");
  Ok(redirect(&format!("/shop/orders/{}/", pk)))
}

pub async fn confirm_delete_order_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let order = load_order(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::delete_order", skip(app_state, path), fields(order_id = *path))]
pub async fn delete_order_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let pk = path.into_inner();
  if !app_state.store.delete_order(pk).await? {
    return Err(AppError::NotFound(format!("No order found matching the query (pk={}).", pk)));
  }
  info!(order_id = pk, "Order deleted.");
  Ok(redirect(ORDERS_LIST_URL))
}
