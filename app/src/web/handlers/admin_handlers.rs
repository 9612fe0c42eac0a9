// storefront/app/src/web/handlers/admin_handlers.rs

//! Staff-only product and order administration under `/admin/`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::{AppError, FormErrors, Result};
use crate::pipelines::csv_import_pipeline;
use crate::services::csv_service;
use crate::state::AppState;
use crate::storage::ProductFilter;
use crate::web::extractors::StaffUser;
use crate::web::forms::{read_form, read_urlencoded, MAX_FORM_FILE_BYTES};
use crate::web::handlers::api_handlers::csv_attachment;
use crate::web::redirect;

const PRODUCTS_CHANGELIST_URL: &str = "/admin/shop/products/";
pub const ADMIN_EXPORT_FILENAME: &str = "product-export.csv";

pub async fn admin_index_handler(user: StaffUser) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "user": user.0.username,
    "apps": { "shop": ["products", "orders"] },
  }))
}

#[derive(Debug, Deserialize)]
pub struct ChangelistQuery {
  pub q: Option<String>,
}

#[instrument(name = "handler::admin_products", skip(app_state, _user, query))]
pub async fn products_changelist_handler(
  app_state: web::Data<AppState>,
  _user: StaffUser,
  query: web::Query<ChangelistQuery>,
) -> Result<HttpResponse> {
  let filter = ProductFilter {
    search: query.q.clone().filter(|q| !q.trim().is_empty()),
    ..ProductFilter::by_pk()
  };
  let products = app_state.store.list_products(&filter).await?;
  let rows: Vec<_> = products
    .iter()
    .map(|p| {
      json!({
        "pk": p.id,
        "name": p.name,
        "description_short": p.description_short(),
        "price": p.price,
        "discount": p.discount,
        "archived": p.archived,
      })
    })
    .collect();
  Ok(HttpResponse::Ok().json(json!({ "count": rows.len(), "results": rows })))
}

/// Selected pks from an admin action form (`ids`, repeated).
async fn selected_ids(payload: web::Payload) -> Result<Vec<i64>> {
  let form = read_urlencoded(payload).await?;
  let ids: Vec<i64> = form.texts("ids").filter_map(|raw| raw.trim().parse().ok()).collect();
  if ids.is_empty() {
    let mut errors = FormErrors::new();
    errors.add("ids", "Items must be selected in order to perform actions on them.");
    errors.into_result()?;
  }
  Ok(ids)
}

#[instrument(name = "handler::admin_archive", skip_all)]
pub async fn archive_products_handler(
  app_state: web::Data<AppState>,
  _user: StaffUser,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let ids = selected_ids(payload).await?;
  let touched = app_state.store.set_archived(&ids, true).await?;
  info!(touched, "Products archived.");
  Ok(redirect(PRODUCTS_CHANGELIST_URL))
}

#[instrument(name = "handler::admin_unarchive", skip_all)]
pub async fn unarchive_products_handler(
  app_state: web::Data<AppState>,
  _user: StaffUser,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let ids = selected_ids(payload).await?;
  let touched = app_state.store.set_archived(&ids, false).await?;
  info!(touched, "Products unarchived.");
  Ok(redirect(PRODUCTS_CHANGELIST_URL))
}

#[instrument(name = "handler::admin_export_csv", skip_all)]
pub async fn export_products_csv_handler(
  app_state: web::Data<AppState>,
  _user: StaffUser,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let ids = selected_ids(payload).await?;
  let filter = ProductFilter {
    ids: Some(ids),
    ..ProductFilter::by_pk()
  };
  let products = app_state.store.list_products(&filter).await?;
  let body = csv_service::write_products(&products, csv_service::ADMIN_EXPORT_FIELDS)?;
  Ok(csv_attachment(ADMIN_EXPORT_FILENAME, body))
}

pub async fn import_products_form_handler(_user: StaffUser) -> HttpResponse {
  HttpResponse::Ok().json(json!({ "form": { "fields": ["csv_file"] } }))
}

#[instrument(name = "handler::admin_import_csv", skip_all)]
pub async fn import_products_csv_handler(
  app_state: web::Data<AppState>,
  _user: StaffUser,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let form = read_form(&req, payload, MAX_FORM_FILE_BYTES).await?;
  let Some(file) = form.file("csv_file") else {
    let mut errors = FormErrors::new();
    errors.add("csv_file", "This field is required.");
    return Err(AppError::Form(errors));
  };
  let created =
    csv_import_pipeline::import_products(&app_state.workflows, app_state.store.clone(), file.bytes.clone()).await?;
  info!(count = created.len(), "Imported products from admin CSV upload.");
  Ok(redirect(PRODUCTS_CHANGELIST_URL))
}

#[instrument(name = "handler::admin_orders", skip_all)]
pub async fn orders_changelist_handler(app_state: web::Data<AppState>, _user: StaffUser) -> Result<HttpResponse> {
  let mut orders = app_state.store.list_orders().await?;
  orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at).then(b.order.id.cmp(&a.order.id)));
  let rows: Vec<_> = orders
    .iter()
    .map(|o| {
      json!({
        "pk": o.order.id,
        "delivery_address": o.order.delivery_address,
        "promocode": o.order.promocode,
        "created_at": o.order.created_at,
        "user_verbose": o.user.verbose_name(),
        "products": o.products.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
      })
    })
    .collect();
  Ok(HttpResponse::Ok().json(json!({ "count": rows.len(), "results": rows })))
}
