// storefront/app/src/web/handlers/request_handlers.rs

//! Request-data demos under `/req/`.

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::errors::{AppError, FormErrors, Result};
use crate::services::media::UPLOADS_DIR;
use crate::state::AppState;
use crate::web::forms::read_form;
use crate::web::middleware::UserAgent;

/// Concatenates the `a` and `b` query parameters.
pub async fn get_params_handler(req: HttpRequest, query: web::Query<HashMap<String, String>>) -> HttpResponse {
  let a = query.get("a").cloned().unwrap_or_default();
  let b = query.get("b").cloned().unwrap_or_default();
  let user_agent = req.extensions().get::<UserAgent>().and_then(|ua| ua.0.clone());
  HttpResponse::Ok().json(json!({
    "a": a,
    "b": b,
    "result": format!("{}{}", a, b),
    "user_agent": user_agent,
  }))
}

pub async fn bio_form_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "form": { "fields": ["name", "bio"] } }))
}

/// Echoes the posted fields back.
pub async fn bio_submit_handler(app_state: web::Data<AppState>, req: HttpRequest, payload: web::Payload) -> Result<HttpResponse> {
  let form = read_form(&req, payload, app_state.config.upload_max_bytes).await?;
  let fields: Map<String, Value> = form
    .fields
    .into_iter()
    .map(|(k, v)| (k, Value::String(v)))
    .collect();
  Ok(HttpResponse::Ok().json(json!({ "fields": fields })))
}

/// Stores `myfile` under `uploads/`. Files over the configured limit are
/// rejected while streaming.
#[instrument(name = "handler::upload_file", skip_all)]
pub async fn upload_file_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let form = read_form(&req, payload, app_state.config.upload_max_bytes).await?;
  let Some(file) = form.file("myfile") else {
    let mut errors = FormErrors::new();
    errors.add("myfile", "This field is required.");
    return Err(AppError::Form(errors));
  };
  let saved = app_state.media.save(UPLOADS_DIR, &file.file_name, &file.bytes).await?;
  info!(path = %saved, size = file.bytes.len(), "File uploaded.");
  Ok(HttpResponse::Ok().json(json!({
    "saved": saved,
    "name": file.file_name,
    "size": file.bytes.len(),
  })))
}
