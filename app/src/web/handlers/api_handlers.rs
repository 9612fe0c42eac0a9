// storefront/app/src/web/handlers/api_handlers.rs

//! REST resource for products under `/shop/api/`.

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, instrument};

use crate::errors::{AppError, FormErrors, Result};
use crate::models::product::parse_checkbox;
use crate::models::{NewProduct, ProductChanges};
use crate::pipelines::csv_import_pipeline;
use crate::services::csv_service;
use crate::state::AppState;
use crate::storage::{ProductFilter, ProductOrdering};
use crate::web::forms::{read_form, MAX_FORM_FILE_BYTES};
use crate::web::handlers::product_handlers::load_product;

pub const CSV_EXPORT_FILENAME: &str = "products-export.csv";

pub async fn api_root_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "products": app_state.config.absolute_url("/shop/api/products/"),
  }))
}

/// Turns list query parameters into a filter. Defaults to pk order.
pub fn filter_from_query(params: &HashMap<String, String>) -> Result<ProductFilter> {
  let mut errors = FormErrors::new();
  let text = |key: &str| params.get(key).map(|v| v.to_string()).filter(|v| !v.is_empty());

  let price = match text("price") {
    Some(raw) => match Decimal::from_str(raw.trim()) {
      Ok(price) => Some(price),
      Err(_) => {
        errors.add("price", "Enter a number.");
        None
      }
    },
    None => None,
  };
  let discount = match text("discount") {
    Some(raw) => match raw.trim().parse::<i32>() {
      Ok(discount) => Some(discount),
      Err(_) => {
        errors.add("discount", "Enter a number.");
        None
      }
    },
    None => None,
  };
  let archived = text("archived").map(|raw| parse_checkbox(Some(&raw)));
  errors.into_result()?;

  Ok(ProductFilter {
    search: text("search"),
    name: text("name"),
    description: text("description"),
    price,
    discount,
    archived,
    ordering: text("ordering")
      .and_then(|raw| ProductOrdering::from_param(&raw))
      .unwrap_or(ProductOrdering::Pk),
    ..ProductFilter::default()
  })
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<Decimal>,
  pub discount: Option<i32>,
  pub archived: Option<bool>,
}

impl ProductPayload {
  fn into_new_product(self) -> Result<NewProduct> {
    let Some(name) = self.name else {
      let mut errors = FormErrors::new();
      errors.add("name", "This field is required.");
      return Err(AppError::Form(errors));
    };
    NewProduct {
      name,
      description: self.description.unwrap_or_default(),
      price: self.price.unwrap_or_default(),
      discount: self.discount.unwrap_or_default(),
      archived: self.archived.unwrap_or_default(),
    }
    .validated()
  }

  fn into_changes(self) -> Result<ProductChanges> {
    ProductChanges {
      name: self.name,
      description: self.description,
      price: self.price,
      discount: self.discount,
      archived: self.archived,
      preview: None,
    }
    .validated()
  }
}

#[instrument(name = "handler::api_list_products", skip(app_state, query))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse> {
  let filter = filter_from_query(&query)?;
  let products = app_state.store.list_products(&filter).await?;
  info!(count = products.len(), "API product list.");
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::api_create_product", skip(app_state, payload))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ProductPayload>,
) -> Result<HttpResponse> {
  let product = payload.into_inner().into_new_product()?;
  let created = app_state.store.create_product(product).await?;
  info!(product_id = created.id, "Product created through the API.");
  Ok(HttpResponse::Created().json(created))
}

pub async fn retrieve_product_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let product = load_product(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

/// `PUT` replaces the writable fields, so `name` is required.
pub async fn replace_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  payload: web::Json<ProductPayload>,
) -> Result<HttpResponse> {
  let pk = path.into_inner();
  load_product(&app_state, pk).await?;
  let product = payload.into_inner().into_new_product()?;
  let changes = ProductChanges {
    name: Some(product.name),
    description: Some(product.description),
    price: Some(product.price),
    discount: Some(product.discount),
    archived: Some(product.archived),
    preview: None,
  };
  update(&app_state, pk, changes).await
}

pub async fn patch_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  payload: web::Json<ProductPayload>,
) -> Result<HttpResponse> {
  let changes = payload.into_inner().into_changes()?;
  update(&app_state, path.into_inner(), changes).await
}

async fn update(app_state: &AppState, pk: i64, changes: ProductChanges) -> Result<HttpResponse> {
  let updated = app_state
    .store
    .update_product(pk, changes)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No product found matching the query (pk={}).", pk)))?;
  info!(product_id = pk, "Product updated through the API.");
  Ok(HttpResponse::Ok().json(updated))
}

#[instrument(name = "handler::api_delete_product", skip(app_state, path), fields(product_id = *path))]
pub async fn delete_product_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let pk = path.into_inner();
  if !app_state.store.delete_product(pk).await? {
    return Err(AppError::NotFound(format!("No product found matching the query (pk={}).", pk)));
  }
  info!(product_id = pk, "Product deleted through the API.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::api_download_csv", skip(app_state, query))]
pub async fn download_csv_handler(
  app_state: web::Data<AppState>,
  query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse> {
  let filter = filter_from_query(&query)?;
  let products = app_state.store.list_products(&filter).await?;
  let body = csv_service::write_products(&products, csv_service::API_EXPORT_FIELDS)?;
  Ok(csv_attachment(CSV_EXPORT_FILENAME, body))
}

#[instrument(name = "handler::api_upload_csv", skip_all)]
pub async fn upload_csv_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let form = read_form(&req, payload, MAX_FORM_FILE_BYTES).await?;
  let Some(file) = form.file("file") else {
    let mut errors = FormErrors::new();
    errors.add("file", "No file was submitted.");
    return Err(AppError::Form(errors));
  };
  let created =
    csv_import_pipeline::import_products(&app_state.workflows, app_state.store.clone(), file.bytes.clone()).await?;
  Ok(HttpResponse::Ok().json(created))
}

pub(crate) fn csv_attachment(filename: &str, body: Vec<u8>) -> HttpResponse {
  HttpResponse::Ok()
    .content_type("text/csv")
    .insert_header((header::CONTENT_DISPOSITION, format!("attachment; filename={}", filename)))
    .body(body)
}
