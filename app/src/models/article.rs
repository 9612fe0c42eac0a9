// storefront/app/src/models/article.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Blog entry. Unpublished articles (`published_date` is `None`) stay out of
/// listings, the feed and the sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Article {
  pub id: i64,
  pub title: String,
  pub body: String,
  pub published_date: Option<DateTime<Utc>>,
}

impl Article {
  pub fn path(&self) -> String {
    format!("/blog/articles/{}", self.id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewArticle {
  pub title: String,
  #[serde(default)]
  pub body: String,
  #[serde(default)]
  pub published_date: Option<DateTime<Utc>>,
}
