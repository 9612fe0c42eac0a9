// storefront/app/src/storage/mod.rs

//! Persistence boundary.
//!
//! Handlers, workflows and the CLI only ever talk to `dyn Store`. `PgStore`
//! is the production backend; `MemoryStore` backs tests and database-less
//! local runs. Both must agree on ordering and on which writes are atomic.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::Result;
use crate::models::{
  Article, Group, NewArticle, NewOrder, NewProduct, NewUser, Order, OrderDetails, OrderTotal, PriceStats,
  Product, ProductChanges, ProductImage, Profile, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ProductOrdering {
  /// Model default: name, then price.
  #[default]
  NameThenPrice,
  Pk,
  PkDesc,
}

impl ProductOrdering {
  /// Parses a REST `ordering` parameter. Only `pk`/`-pk` (and the `id`
  /// aliases) are orderable; anything else is ignored.
  pub fn from_param(raw: &str) -> Option<Self> {
    match raw.trim() {
      "pk" | "id" => Some(Self::Pk),
      "-pk" | "-id" => Some(Self::PkDesc),
      _ => None,
    }
  }

  pub(crate) fn sql(self) -> &'static str {
    match self {
      Self::NameThenPrice => "name ASC, price ASC, id ASC",
      Self::Pk => "id ASC",
      Self::PkDesc => "id DESC",
    }
  }
}

/// Product query. Every set field narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
  /// Whitespace-separated terms; each must appear in name or description,
  /// case-insensitively.
  pub search: Option<String>,
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<Decimal>,
  pub discount: Option<i32>,
  pub archived: Option<bool>,
  /// Case-sensitive substring of the name.
  pub name_contains: Option<String>,
  pub ids: Option<Vec<i64>>,
  pub ordering: ProductOrdering,
}

impl ProductFilter {
  pub fn active() -> Self {
    Self {
      archived: Some(false),
      ..Self::default()
    }
  }

  pub fn by_pk() -> Self {
    Self {
      ordering: ProductOrdering::Pk,
      ..Self::default()
    }
  }

  pub(crate) fn search_terms(&self) -> Vec<String> {
    self
      .search
      .as_deref()
      .map(|s| s.split_whitespace().map(str::to_lowercase).collect())
      .unwrap_or_default()
  }

  pub fn matches(&self, product: &Product) -> bool {
    let name = product.name.to_lowercase();
    let description = product.description.to_lowercase();
    let search_ok = self
      .search_terms()
      .iter()
      .all(|term| name.contains(term.as_str()) || description.contains(term.as_str()));

    search_ok
      && self.name.as_ref().map_or(true, |n| &product.name == n)
      && self.description.as_ref().map_or(true, |d| &product.description == d)
      && self.price.map_or(true, |p| product.price == p)
      && self.discount.map_or(true, |d| product.discount == d)
      && self.archived.map_or(true, |a| product.archived == a)
      && self.name_contains.as_ref().map_or(true, |n| product.name.contains(n.as_str()))
      && self.ids.as_ref().map_or(true, |ids| ids.contains(&product.id))
  }
}

/// Outcome of `get_or_create_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpsert {
  pub order: Order,
  pub created: bool,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
  /// Short backend name, reported by the health endpoint.
  fn kind(&self) -> &'static str;

  // --- Products ---
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
  async fn get_product(&self, id: i64) -> Result<Option<Product>>;
  async fn create_product(&self, product: NewProduct) -> Result<Product>;
  /// All-or-nothing insert; returned in insertion order.
  async fn create_products(&self, products: Vec<NewProduct>) -> Result<Vec<Product>>;
  async fn update_product(&self, id: i64, changes: ProductChanges) -> Result<Option<Product>>;
  /// Returns how many rows were touched.
  async fn set_archived(&self, ids: &[i64], archived: bool) -> Result<u64>;
  async fn delete_product(&self, id: i64) -> Result<bool>;
  /// Sets `discount` on every product whose name contains `name_fragment`.
  async fn apply_discount(&self, name_fragment: &str, discount: i32) -> Result<u64>;
  async fn price_stats(&self, name_fragment: Option<&str>) -> Result<PriceStats>;

  // --- Product images ---
  async fn product_images(&self, product_id: i64) -> Result<Vec<ProductImage>>;
  /// Drops every existing image row of the product and inserts `images`
  /// (`(path, description)` pairs) in one transaction.
  async fn replace_product_images(&self, product_id: i64, images: Vec<(String, String)>) -> Result<Vec<ProductImage>>;

  // --- Orders ---
  async fn list_orders(&self) -> Result<Vec<OrderDetails>>;
  async fn get_order(&self, id: i64) -> Result<Option<OrderDetails>>;
  async fn create_order(&self, order: NewOrder) -> Result<Order>;
  /// Rewrites the scalar fields and replaces the product set.
  async fn update_order(&self, id: i64, order: NewOrder) -> Result<Option<Order>>;
  async fn delete_order(&self, id: i64) -> Result<bool>;
  /// Looks an order up by (address, promocode, user), creating it when
  /// absent, then links `order.product_ids` plus every product matching
  /// `catalog`. The catalog lookup runs inside the same transaction.
  async fn get_or_create_order(&self, order: NewOrder, catalog: Option<&ProductFilter>) -> Result<OrderUpsert>;
  async fn add_order_products(&self, order_id: i64, product_ids: &[i64]) -> Result<()>;
  async fn first_order(&self) -> Result<Option<Order>>;
  async fn order_totals(&self) -> Result<Vec<OrderTotal>>;

  // --- Users ---
  async fn create_user(&self, user: NewUser) -> Result<User>;
  async fn user_by_id(&self, id: i64) -> Result<Option<User>>;
  async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
  async fn usernames(&self) -> Result<Vec<String>>;
  /// Fails with `AppError::Protected` while the user still owns orders.
  async fn delete_user(&self, id: i64) -> Result<bool>;
  async fn create_profile(&self, profile: Profile) -> Result<Profile>;
  async fn profile(&self, user_id: i64) -> Result<Option<Profile>>;

  // --- Groups ---
  async fn list_groups(&self) -> Result<Vec<Group>>;
  async fn create_group(&self, name: &str) -> Result<Group>;

  // --- Blog ---
  /// Published articles, newest first.
  async fn list_articles(&self, limit: Option<usize>) -> Result<Vec<Article>>;
  async fn get_article(&self, id: i64) -> Result<Option<Article>>;
  async fn create_article(&self, article: NewArticle) -> Result<Article>;
}

pub(crate) fn duplicate_username() -> crate::errors::AppError {
  let mut errors = crate::errors::FormErrors::new();
  errors.add("username", "A user with that username already exists.");
  crate::errors::AppError::Form(errors)
}

pub(crate) fn duplicate_group() -> crate::errors::AppError {
  let mut errors = crate::errors::FormErrors::new();
  errors.add("name", "Group with this Name already exists.");
  crate::errors::AppError::Form(errors)
}
