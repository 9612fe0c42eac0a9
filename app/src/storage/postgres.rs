// storefront/app/src/storage/postgres.rs

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, instrument};

use super::{duplicate_group, duplicate_username, OrderUpsert, ProductFilter, Store};
use crate::errors::{AppError, Result};
use crate::models::{
  Article, Group, NewArticle, NewOrder, NewProduct, NewUser, Order, OrderDetails, OrderTotal, PriceStats,
  Product, ProductChanges, ProductImage, Profile, User,
};

const PRODUCT_COLUMNS: &str = "id, name, description, price, discount, created_at, archived, preview";
const ORDER_COLUMNS: &str = "id, delivery_address, promocode, created_at, user_id, receipt";
const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, is_staff, date_joined";

#[derive(FromRow)]
struct OrderProductRow {
  order_id: i64,
  #[sqlx(flatten)]
  product: Product,
}

#[derive(Clone, Debug)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  /// Connects and runs the embedded migrations.
  #[instrument(name = "store::pg::connect", skip(database_url))]
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .acquire_timeout(Duration::from_secs(5))
      .connect(database_url)
      .await
      .map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Sqlx(e)
      })?;
    info!("Database pool created successfully.");
    let store = Self { pool };
    store.migrate().await?;
    Ok(store)
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn insert_product(tx: &mut Transaction<'_, Postgres>, product: &NewProduct) -> Result<Product> {
    let row = sqlx::query_as::<_, Product>(&format!(
      "INSERT INTO products (name, description, price, discount, archived) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.discount)
    .bind(product.archived)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
  }

  async fn link_products(tx: &mut Transaction<'_, Postgres>, order_id: i64, product_ids: &[i64]) -> Result<()> {
    if product_ids.is_empty() {
      return Ok(());
    }
    sqlx::query(
      "INSERT INTO order_products (order_id, product_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
    )
    .bind(order_id)
    .bind(product_ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| missing_reference(e, "One of the selected products does not exist."))?;
    Ok(())
  }

  async fn attach_details(&self, orders: Vec<Order>) -> Result<Vec<OrderDetails>> {
    if orders.is_empty() {
      return Ok(Vec::new());
    }
    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let user_ids: Vec<i64> = orders.iter().map(|o| o.user_id).collect();

    let users: HashMap<i64, User> =
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS))
        .bind(&user_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let rows = sqlx::query_as::<_, OrderProductRow>(
      "SELECT op.order_id, p.id, p.name, p.description, p.price, p.discount, p.created_at, p.archived, p.preview \
       FROM order_products op JOIN products p ON p.id = op.product_id \
       WHERE op.order_id = ANY($1) ORDER BY p.name, p.price, p.id",
    )
    .bind(&order_ids)
    .fetch_all(&self.pool)
    .await?;

    let mut products: HashMap<i64, Vec<Product>> = HashMap::new();
    for row in rows {
      products.entry(row.order_id).or_default().push(row.product);
    }

    orders
      .into_iter()
      .map(|order| {
        let user = users
          .get(&order.user_id)
          .ok_or_else(|| AppError::Internal(format!("Order {} references a missing user.", order.id)))?
          .summary();
        let products = products.remove(&order.id).unwrap_or_default();
        Ok(OrderDetails { order, user, products })
      })
      .collect()
  }
}

/// Maps a foreign-key violation to a validation error; passes anything else through.
fn missing_reference(err: sqlx::Error, message: &str) -> AppError {
  match &err {
    sqlx::Error::Database(db) if db.is_foreign_key_violation() => AppError::Validation(message.to_string()),
    _ => AppError::Sqlx(err),
  }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn push_product_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
  for term in filter.search_terms() {
    let pattern = format!("%{}%", escape_like(&term));
    qb.push(" AND (name ILIKE ")
      .push_bind(pattern.clone())
      .push(" OR description ILIKE ")
      .push_bind(pattern)
      .push(")");
  }
  if let Some(name) = &filter.name {
    qb.push(" AND name = ").push_bind(name.clone());
  }
  if let Some(description) = &filter.description {
    qb.push(" AND description = ").push_bind(description.clone());
  }
  if let Some(price) = filter.price {
    qb.push(" AND price = ").push_bind(price);
  }
  if let Some(discount) = filter.discount {
    qb.push(" AND discount = ").push_bind(discount);
  }
  if let Some(archived) = filter.archived {
    qb.push(" AND archived = ").push_bind(archived);
  }
  if let Some(fragment) = &filter.name_contains {
    qb.push(" AND name LIKE ").push_bind(format!("%{}%", escape_like(fragment)));
  }
  if let Some(ids) = &filter.ids {
    qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
  }
}

fn escape_like(raw: &str) -> String {
  raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[async_trait]
impl Store for PgStore {
  fn kind(&self) -> &'static str {
    "postgres"
  }

  #[instrument(name = "store::pg::list_products", skip(self))]
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products WHERE TRUE", PRODUCT_COLUMNS));
    push_product_filter(&mut qb, filter);
    qb.push(" ORDER BY ").push(filter.ordering.sql());
    Ok(qb.build_query_as::<Product>().fetch_all(&self.pool).await?)
  }

  async fn get_product(&self, id: i64) -> Result<Option<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "store::pg::create_product", skip(self, product), fields(name = %product.name))]
  async fn create_product(&self, product: NewProduct) -> Result<Product> {
    let mut tx = self.pool.begin().await?;
    let row = Self::insert_product(&mut tx, &product).await?;
    tx.commit().await?;
    Ok(row)
  }

  #[instrument(name = "store::pg::create_products", skip(self, products), fields(count = products.len()))]
  async fn create_products(&self, products: Vec<NewProduct>) -> Result<Vec<Product>> {
    let mut tx = self.pool.begin().await?;
    let mut created = Vec::with_capacity(products.len());
    for product in &products {
      created.push(Self::insert_product(&mut tx, product).await?);
    }
    tx.commit().await?;
    Ok(created)
  }

  async fn update_product(&self, id: i64, changes: ProductChanges) -> Result<Option<Product>> {
    let mut tx = self.pool.begin().await?;
    let current = sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1 FOR UPDATE", PRODUCT_COLUMNS))
      .bind(id)
      .fetch_optional(&mut *tx)
      .await?;
    let Some(mut product) = current else {
      return Ok(None);
    };
    changes.apply_to(&mut product);
    let updated = sqlx::query_as::<_, Product>(&format!(
      "UPDATE products SET name = $2, description = $3, price = $4, discount = $5, archived = $6, preview = $7 \
       WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(product.discount)
    .bind(product.archived)
    .bind(&product.preview)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some(updated))
  }

  async fn set_archived(&self, ids: &[i64], archived: bool) -> Result<u64> {
    let result = sqlx::query("UPDATE products SET archived = $1 WHERE id = ANY($2)")
      .bind(archived)
      .bind(ids)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  async fn delete_product(&self, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  async fn apply_discount(&self, name_fragment: &str, discount: i32) -> Result<u64> {
    let result = sqlx::query("UPDATE products SET discount = $1 WHERE name LIKE $2")
      .bind(discount)
      .bind(format!("%{}%", escape_like(name_fragment)))
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  async fn price_stats(&self, name_fragment: Option<&str>) -> Result<PriceStats> {
    let pattern = format!("%{}%", escape_like(name_fragment.unwrap_or_default()));
    Ok(
      sqlx::query_as::<_, PriceStats>(
        "SELECT COUNT(price) AS count, AVG(price) AS avg, MIN(price) AS min, MAX(price) AS max \
         FROM products WHERE name LIKE $1",
      )
      .bind(pattern)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn product_images(&self, product_id: i64) -> Result<Vec<ProductImage>> {
    Ok(
      sqlx::query_as::<_, ProductImage>(
        "SELECT id, product_id, image, description FROM product_images WHERE product_id = $1 ORDER BY id",
      )
      .bind(product_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "store::pg::replace_product_images", skip(self, images), fields(count = images.len()))]
  async fn replace_product_images(&self, product_id: i64, images: Vec<(String, String)>) -> Result<Vec<ProductImage>> {
    let mut tx = self.pool.begin().await?;
    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
      .bind(product_id)
      .execute(&mut *tx)
      .await?;
    let mut created = Vec::with_capacity(images.len());
    for (image, description) in images {
      let row = sqlx::query_as::<_, ProductImage>(
        "INSERT INTO product_images (product_id, image, description) VALUES ($1, $2, $3) \
         RETURNING id, product_id, image, description",
      )
      .bind(product_id)
      .bind(image)
      .bind(description)
      .fetch_one(&mut *tx)
      .await
      .map_err(|e| missing_reference(e, "Product does not exist."))?;
      created.push(row);
    }
    tx.commit().await?;
    Ok(created)
  }

  async fn list_orders(&self) -> Result<Vec<OrderDetails>> {
    let orders = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders ORDER BY id", ORDER_COLUMNS))
      .fetch_all(&self.pool)
      .await?;
    self.attach_details(orders).await
  }

  async fn get_order(&self, id: i64) -> Result<Option<OrderDetails>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    match order {
      Some(order) => Ok(self.attach_details(vec![order]).await?.pop()),
      None => Ok(None),
    }
  }

  #[instrument(name = "store::pg::create_order", skip(self, order), fields(user_id = order.user_id))]
  async fn create_order(&self, order: NewOrder) -> Result<Order> {
    let mut tx = self.pool.begin().await?;
    let row = sqlx::query_as::<_, Order>(&format!(
      "INSERT INTO orders (delivery_address, promocode, user_id, receipt) VALUES ($1, $2, $3, $4) RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(&order.delivery_address)
    .bind(&order.promocode)
    .bind(order.user_id)
    .bind(&order.receipt)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| missing_reference(e, "User does not exist."))?;
    Self::link_products(&mut tx, row.id, &order.product_ids).await?;
    tx.commit().await?;
    Ok(row)
  }

  async fn update_order(&self, id: i64, order: NewOrder) -> Result<Option<Order>> {
    let mut tx = self.pool.begin().await?;
    let updated = sqlx::query_as::<_, Order>(&format!(
      "UPDATE orders SET delivery_address = $2, promocode = $3, user_id = $4, \
       receipt = COALESCE($5, receipt) WHERE id = $1 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(&order.delivery_address)
    .bind(&order.promocode)
    .bind(order.user_id)
    .bind(&order.receipt)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| missing_reference(e, "User does not exist."))?;
    let Some(updated) = updated else {
      return Ok(None);
    };
    sqlx::query("DELETE FROM order_products WHERE order_id = $1")
      .bind(id)
      .execute(&mut *tx)
      .await?;
    Self::link_products(&mut tx, id, &order.product_ids).await?;
    tx.commit().await?;
    Ok(Some(updated))
  }

  async fn delete_order(&self, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(name = "store::pg::get_or_create_order", skip(self, order, catalog), fields(user_id = order.user_id))]
  async fn get_or_create_order(&self, order: NewOrder, catalog: Option<&ProductFilter>) -> Result<OrderUpsert> {
    let mut tx = self.pool.begin().await?;
    let mut product_ids = order.product_ids.clone();
    if let Some(filter) = catalog {
      let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM products WHERE TRUE");
      push_product_filter(&mut qb, filter);
      qb.push(" ORDER BY id FOR SHARE");
      let matched: Vec<i64> = qb.build_query_scalar::<i64>().fetch_all(&mut *tx).await?;
      for id in matched {
        if !product_ids.contains(&id) {
          product_ids.push(id);
        }
      }
    }

    let existing = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders WHERE delivery_address = $1 AND promocode = $2 AND user_id = $3 \
       ORDER BY id LIMIT 1 FOR UPDATE",
      ORDER_COLUMNS
    ))
    .bind(&order.delivery_address)
    .bind(&order.promocode)
    .bind(order.user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (row, created) = match existing {
      Some(row) => (row, false),
      None => {
        let row = sqlx::query_as::<_, Order>(&format!(
          "INSERT INTO orders (delivery_address, promocode, user_id, receipt) VALUES ($1, $2, $3, $4) RETURNING {}",
          ORDER_COLUMNS
        ))
        .bind(&order.delivery_address)
        .bind(&order.promocode)
        .bind(order.user_id)
        .bind(&order.receipt)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| missing_reference(e, "User does not exist."))?;
        (row, true)
      }
    };
    Self::link_products(&mut tx, row.id, &product_ids).await?;
    tx.commit().await?;
    Ok(OrderUpsert { order: row, created })
  }

  async fn add_order_products(&self, order_id: i64, product_ids: &[i64]) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    Self::link_products(&mut tx, order_id, product_ids)
      .await
      .map_err(|e| match e {
        AppError::Validation(_) => AppError::NotFound(format!("Order {} or one of its products not found.", order_id)),
        other => other,
      })?;
    tx.commit().await?;
    Ok(())
  }

  async fn first_order(&self) -> Result<Option<Order>> {
    Ok(
      sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders ORDER BY id LIMIT 1", ORDER_COLUMNS))
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn order_totals(&self) -> Result<Vec<OrderTotal>> {
    Ok(
      sqlx::query_as::<_, OrderTotal>(
        "SELECT o.id AS order_id, COUNT(p.id) AS product_count, COALESCE(SUM(p.price), 0) AS total \
         FROM orders o \
         LEFT JOIN order_products op ON op.order_id = o.id \
         LEFT JOIN products p ON p.id = op.product_id \
         GROUP BY o.id ORDER BY o.id",
      )
      .fetch_all(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "store::pg::create_user", skip(self, user), fields(username = %user.username))]
  async fn create_user(&self, user: NewUser) -> Result<User> {
    sqlx::query_as::<_, User>(&format!(
      "INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      USER_COLUMNS
    ))
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| if is_unique_violation(&e) { duplicate_username() } else { AppError::Sqlx(e) })
  }

  async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn usernames(&self) -> Result<Vec<String>> {
    Ok(
      sqlx::query_scalar::<_, String>("SELECT username FROM users ORDER BY id")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn delete_user(&self, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
          AppError::Protected(format!("User {} still owns orders.", id))
        }
        _ => AppError::Sqlx(e),
      })?;
    Ok(result.rows_affected() > 0)
  }

  async fn create_profile(&self, profile: Profile) -> Result<Profile> {
    sqlx::query_as::<_, Profile>(
      "INSERT INTO profiles (user_id, bio, agreement_accepted) VALUES ($1, $2, $3) \
       RETURNING user_id, bio, agreement_accepted",
    )
    .bind(profile.user_id)
    .bind(&profile.bio)
    .bind(profile.agreement_accepted)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if is_unique_violation(&e) {
        AppError::Validation(format!("User {} already has a profile.", profile.user_id))
      } else {
        missing_reference(e, "User does not exist.")
      }
    })
  }

  async fn profile(&self, user_id: i64) -> Result<Option<Profile>> {
    Ok(
      sqlx::query_as::<_, Profile>("SELECT user_id, bio, agreement_accepted FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn list_groups(&self) -> Result<Vec<Group>> {
    Ok(
      sqlx::query_as::<_, Group>("SELECT id, name, permissions FROM groups ORDER BY id")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn create_group(&self, name: &str) -> Result<Group> {
    sqlx::query_as::<_, Group>("INSERT INTO groups (name) VALUES ($1) RETURNING id, name, permissions")
      .bind(name)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| if is_unique_violation(&e) { duplicate_group() } else { AppError::Sqlx(e) })
  }

  async fn list_articles(&self, limit: Option<usize>) -> Result<Vec<Article>> {
    let limit = limit.map(|l| l as i64);
    Ok(
      sqlx::query_as::<_, Article>(
        "SELECT id, title, body, published_date FROM articles WHERE published_date IS NOT NULL \
         ORDER BY published_date DESC, id DESC LIMIT $1",
      )
      .bind(limit)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn get_article(&self, id: i64) -> Result<Option<Article>> {
    Ok(
      sqlx::query_as::<_, Article>("SELECT id, title, body, published_date FROM articles WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create_article(&self, article: NewArticle) -> Result<Article> {
    Ok(
      sqlx::query_as::<_, Article>(
        "INSERT INTO articles (title, body, published_date) VALUES ($1, $2, $3) \
         RETURNING id, title, body, published_date",
      )
      .bind(&article.title)
      .bind(&article.body)
      .bind(article.published_date)
      .fetch_one(&self.pool)
      .await?,
    )
  }
}
