// storefront/app/src/web/handlers/product_handlers.rs

//! Catalog pages under `/shop/products/`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::{Product, ProductForm};
use crate::services::cache::PRODUCTS_EXPORT_KEY;
use crate::state::AppState;
use crate::storage::ProductFilter;
use crate::web::forms::{read_form, MAX_FORM_FILE_BYTES};
use crate::web::redirect;

const PRODUCTS_LIST_URL: &str = "/shop/products/";
const PRODUCT_FORM_FIELDS: &[&str] = &["name", "description", "price", "discount", "archived"];

pub(crate) async fn load_product(state: &AppState, pk: i64) -> Result<Product> {
  state.store.get_product(pk).await?.ok_or_else(|| {
    warn!(product_id = pk, "Product not found.");
    AppError::NotFound(format!("No product found matching the query (pk={}).", pk))
  })
}

pub(crate) fn product_json(product: &Product) -> Value {
  let mut value = json!(product);
  value["description_short"] = json!(product.description_short());
  value
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let products = app_state.store.list_products(&ProductFilter::active()).await?;
  info!(count = products.len(), "Listing active products.");
  Ok(HttpResponse::Ok().json(json!({
    "products": products.iter().map(product_json).collect::<Vec<_>>(),
  })))
}

#[instrument(name = "handler::product_details", skip(app_state, path), fields(product_id = *path))]
pub async fn product_details_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let pk = path.into_inner();
  let product = load_product(&app_state, pk).await?;
  let images = app_state.store.product_images(pk).await?;
  Ok(HttpResponse::Ok().json(json!({
    "product": product_json(&product),
    "images": images,
  })))
}

pub async fn create_product_form_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "form": { "fields": PRODUCT_FORM_FIELDS } }))
}

#[instrument(name = "handler::create_product", skip(app_state, form))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  form: web::Form<ProductForm>,
) -> Result<HttpResponse> {
  let product = form.into_inner().into_new_product()?;
  let created = app_state.store.create_product(product).await?;
  info!(product_id = created.id, "Product created.");
  Ok(redirect(PRODUCTS_LIST_URL))
}

#[instrument(name = "handler::update_product_form", skip(app_state, path), fields(product_id = *path))]
pub async fn update_product_form_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let product = load_product(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "product": product_json(&product),
    "form": { "fields": ["name", "price", "description", "discount", "preview", "images"] },
  })))
}

/// Saves the product fields, an optional new `preview`, and, when any
/// `images` were uploaded, swaps the product's whole image set for them.
#[instrument(name = "handler::update_product", skip(app_state, req, payload, path), fields(product_id = *path))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Payload,
  path: web::Path<i64>,
) -> Result<HttpResponse> {
  let pk = path.into_inner();
  load_product(&app_state, pk).await?;
  let form = read_form(&req, payload, MAX_FORM_FILE_BYTES).await?;

  let mut changes = ProductForm::from_fields(form.pairs()).into_changes()?;
  if let Some(preview) = form.file("preview") {
    let path = app_state
      .media
      .save(&Product::preview_dir(pk), &preview.file_name, &preview.bytes)
      .await?;
    changes.preview = Some(path);
  }
  app_state
    .store
    .update_product(pk, changes)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No product found matching the query (pk={}).", pk)))?;

  let uploads: Vec<_> = form.files("images").collect();
  if !uploads.is_empty() {
    let old = app_state.store.product_images(pk).await?;
    let mut saved = Vec::with_capacity(uploads.len());
    for upload in uploads {
      let path = app_state
        .media
        .save(&Product::images_dir(pk), &upload.file_name, &upload.bytes)
        .await?;
      saved.push((path, String::new()));
    }
    let images = app_state.store.replace_product_images(pk, saved).await?;
    for image in old {
      app_state.media.delete(&image.image).await?;
    }
    info!(product_id = pk, count = images.len(), "Product images replaced.");
  }

  Ok(redirect(&format!("/shop/products/{}/", pk)))
}

pub async fn confirm_delete_product_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let product = load_product(&app_state, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "product": product_json(&product) })))
}

/// Soft delete: the product is archived, never removed.
#[instrument(name = "handler::archive_product", skip(app_state, path), fields(product_id = *path))]
pub async fn delete_product_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let pk = path.into_inner();
  load_product(&app_state, pk).await?;
  app_state.store.set_archived(&[pk], true).await?;
  info!(product_id = pk, "Product archived.");
  Ok(redirect(PRODUCTS_LIST_URL))
}

/// Every product by pk, prices as strings. Served from the cache while the
/// entry is fresh, so recent writes may not show up yet.
#[instrument(name = "handler::products_export", skip(app_state))]
pub async fn products_export_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  if let Some(cached) = app_state.cache.get(PRODUCTS_EXPORT_KEY) {
    info!("Serving product export from cache.");
    return Ok(HttpResponse::Ok().json(cached));
  }

  let products = app_state.store.list_products(&ProductFilter::by_pk()).await?;
  let data = json!({
    "products": products
      .iter()
      .map(|p| json!({
        "pk": p.id,
        "name": p.name,
        "price": p.price.to_string(),
        "archived": p.archived,
      }))
      .collect::<Vec<_>>(),
  });
  app_state.cache.set(PRODUCTS_EXPORT_KEY, data.clone());
  info!(count = products.len(), "Product export built and cached.");
  Ok(HttpResponse::Ok().json(data))
}
