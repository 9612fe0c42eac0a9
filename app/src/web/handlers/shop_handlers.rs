// storefront/app/src/web/handlers/shop_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::errors::{FormErrors, Result};
use crate::state::AppState;
use crate::web::redirect;

const GROUP_NAME_MAX_LEN: usize = 150;

#[instrument(name = "handler::shop_index", skip(app_state))]
pub async fn shop_index_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let products = [("laptop", 1999), ("desktop", 2999), ("mobile", 999)];
  debug!(?products, "Products for shop index.");
  info!("Rendering shop index.");
  HttpResponse::Ok().json(json!({
    "time_running": app_state.started_at.elapsed().as_secs_f64(),
    "products": products,
  }))
}

#[instrument(name = "handler::list_groups", skip(app_state))]
pub async fn list_groups_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let groups = app_state.store.list_groups().await?;
  Ok(HttpResponse::Ok().json(json!({
    "form": { "fields": ["name"] },
    "groups": groups,
  })))
}

#[derive(Debug, Deserialize)]
pub struct GroupForm {
  #[serde(default)]
  pub name: String,
}

#[instrument(name = "handler::create_group", skip(app_state, form))]
pub async fn create_group_handler(app_state: web::Data<AppState>, form: web::Form<GroupForm>) -> Result<HttpResponse> {
  let name = form.name.trim();
  let mut errors = FormErrors::new();
  if name.is_empty() {
    errors.add("name", "This field is required.");
  } else if name.chars().count() > GROUP_NAME_MAX_LEN {
    errors.add(
      "name",
      format!("Ensure this value has at most {} characters.", GROUP_NAME_MAX_LEN),
    );
  }
  errors.into_result()?;
  let group = app_state.store.create_group(name).await?;
  info!(group_id = group.id, "Group created.");
  Ok(redirect("/shop/groups/"))
}
