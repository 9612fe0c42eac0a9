// storefront/app/src/web/handlers/blog_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use crate::errors::{AppError, Result};
use crate::services::feeds;
use crate::state::AppState;

#[instrument(name = "handler::list_articles", skip(app_state))]
pub async fn list_articles_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let articles = app_state.store.list_articles(None).await?;
  Ok(HttpResponse::Ok().json(json!({ "articles": articles })))
}

pub async fn article_details_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
  let pk = path.into_inner();
  let article = app_state
    .store
    .get_article(pk)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No article found matching the query (pk={}).", pk)))?;
  Ok(HttpResponse::Ok().json(json!({ "article": article })))
}

#[instrument(name = "handler::articles_feed", skip(app_state))]
pub async fn latest_articles_feed_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let articles = app_state.store.list_articles(Some(feeds::FEED_SIZE)).await?;
  let body = feeds::rss_feed(&articles, app_state.config.app_base_url.trim_end_matches('/'));
  Ok(HttpResponse::Ok().content_type("application/rss+xml; charset=utf-8").body(body))
}

#[instrument(name = "handler::sitemap", skip(app_state))]
pub async fn sitemap_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let articles = app_state.store.list_articles(Some(feeds::FEED_SIZE)).await?;
  let body = feeds::sitemap(&articles, app_state.config.app_base_url.trim_end_matches('/'));
  Ok(HttpResponse::Ok().content_type("application/xml").body(body))
}
