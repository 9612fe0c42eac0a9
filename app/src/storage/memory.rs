// storefront/app/src/storage/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::instrument;

use super::{duplicate_group, duplicate_username, OrderUpsert, ProductFilter, ProductOrdering, Store};
use crate::errors::{AppError, Result};
use crate::models::{
  Article, Group, NewArticle, NewOrder, NewProduct, NewUser, Order, OrderDetails, OrderTotal, PriceStats,
  Product, ProductChanges, ProductImage, Profile, User,
};

#[derive(Debug, Default)]
struct Tables {
  products: Vec<Product>,
  images: Vec<ProductImage>,
  orders: Vec<Order>,
  order_products: BTreeSet<(i64, i64)>,
  users: Vec<User>,
  profiles: Vec<Profile>,
  groups: Vec<Group>,
  articles: Vec<Article>,
  last_id: i64,
}

impl Tables {
  fn next_id(&mut self) -> i64 {
    self.last_id += 1;
    self.last_id
  }

  fn insert_product(&mut self, new: NewProduct) -> Product {
    let product = Product {
      id: self.next_id(),
      name: new.name,
      description: new.description,
      price: new.price,
      discount: new.discount,
      created_at: Utc::now(),
      archived: new.archived,
      preview: None,
    };
    self.products.push(product.clone());
    product
  }

  fn require_user(&self, user_id: i64) -> Result<()> {
    if self.users.iter().any(|u| u.id == user_id) {
      Ok(())
    } else {
      Err(AppError::Validation(format!("User {} does not exist.", user_id)))
    }
  }

  fn require_products(&self, ids: &[i64]) -> Result<()> {
    match ids.iter().find(|id| !self.products.iter().any(|p| p.id == **id)) {
      Some(missing) => Err(AppError::Validation(format!("Product {} does not exist.", missing))),
      None => Ok(()),
    }
  }

  fn link_products(&mut self, order_id: i64, ids: &[i64]) {
    for id in ids {
      self.order_products.insert((order_id, *id));
    }
  }

  fn details(&self, order: &Order) -> Option<OrderDetails> {
    let user = self.users.iter().find(|u| u.id == order.user_id)?;
    let mut products: Vec<Product> = self
      .order_products
      .range((order.id, i64::MIN)..=(order.id, i64::MAX))
      .filter_map(|(_, pid)| self.products.iter().find(|p| p.id == *pid).cloned())
      .collect();
    sort_products(&mut products, ProductOrdering::NameThenPrice);
    Some(OrderDetails {
      order: order.clone(),
      user: user.summary(),
      products,
    })
  }
}

fn sort_products(products: &mut [Product], ordering: ProductOrdering) {
  match ordering {
    ProductOrdering::NameThenPrice => {
      products.sort_by(|a, b| a.name.cmp(&b.name).then(a.price.cmp(&b.price)).then(a.id.cmp(&b.id)))
    }
    ProductOrdering::Pk => products.sort_by_key(|p| p.id),
    ProductOrdering::PkDesc => products.sort_by_key(|p| std::cmp::Reverse(p.id)),
  }
}

/// Process-local store. One lock guards every table so multi-table writes
/// are atomic the same way a database transaction is.
#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  fn kind(&self) -> &'static str {
    "memory"
  }

  #[instrument(name = "store::memory::list_products", skip(self))]
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let tables = self.tables.read();
    let mut products: Vec<Product> = tables.products.iter().filter(|p| filter.matches(p)).cloned().collect();
    sort_products(&mut products, filter.ordering);
    Ok(products)
  }

  async fn get_product(&self, id: i64) -> Result<Option<Product>> {
    Ok(self.tables.read().products.iter().find(|p| p.id == id).cloned())
  }

  async fn create_product(&self, product: NewProduct) -> Result<Product> {
    Ok(self.tables.write().insert_product(product))
  }

  async fn create_products(&self, products: Vec<NewProduct>) -> Result<Vec<Product>> {
    let mut tables = self.tables.write();
    Ok(products.into_iter().map(|p| tables.insert_product(p)).collect())
  }

  async fn update_product(&self, id: i64, changes: ProductChanges) -> Result<Option<Product>> {
    let mut tables = self.tables.write();
    Ok(tables.products.iter_mut().find(|p| p.id == id).map(|product| {
      changes.apply_to(product);
      product.clone()
    }))
  }

  async fn set_archived(&self, ids: &[i64], archived: bool) -> Result<u64> {
    let mut tables = self.tables.write();
    let mut touched = 0;
    for product in tables.products.iter_mut().filter(|p| ids.contains(&p.id)) {
      product.archived = archived;
      touched += 1;
    }
    Ok(touched)
  }

  async fn delete_product(&self, id: i64) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.products.len();
    tables.products.retain(|p| p.id != id);
    let removed = tables.products.len() != before;
    if removed {
      tables.images.retain(|img| img.product_id != id);
      tables.order_products.retain(|(_, pid)| *pid != id);
    }
    Ok(removed)
  }

  async fn apply_discount(&self, name_fragment: &str, discount: i32) -> Result<u64> {
    let mut tables = self.tables.write();
    let mut touched = 0;
    for product in tables.products.iter_mut().filter(|p| p.name.contains(name_fragment)) {
      product.discount = discount;
      touched += 1;
    }
    Ok(touched)
  }

  async fn price_stats(&self, name_fragment: Option<&str>) -> Result<PriceStats> {
    let tables = self.tables.read();
    let prices: Vec<Decimal> = tables
      .products
      .iter()
      .filter(|p| name_fragment.map_or(true, |f| p.name.contains(f)))
      .map(|p| p.price)
      .collect();
    if prices.is_empty() {
      return Ok(PriceStats::default());
    }
    let sum: Decimal = prices.iter().copied().sum();
    Ok(PriceStats {
      count: prices.len() as i64,
      avg: Some(sum / Decimal::from(prices.len() as i64)),
      min: prices.iter().copied().min(),
      max: prices.iter().copied().max(),
    })
  }

  async fn product_images(&self, product_id: i64) -> Result<Vec<ProductImage>> {
    Ok(
      self
        .tables
        .read()
        .images
        .iter()
        .filter(|img| img.product_id == product_id)
        .cloned()
        .collect(),
    )
  }

  async fn replace_product_images(&self, product_id: i64, images: Vec<(String, String)>) -> Result<Vec<ProductImage>> {
    let mut tables = self.tables.write();
    if !tables.products.iter().any(|p| p.id == product_id) {
      return Err(AppError::NotFound(format!("Product {} not found.", product_id)));
    }
    tables.images.retain(|img| img.product_id != product_id);
    let mut created = Vec::with_capacity(images.len());
    for (image, description) in images {
      let row = ProductImage {
        id: tables.next_id(),
        product_id,
        image,
        description,
      };
      tables.images.push(row.clone());
      created.push(row);
    }
    Ok(created)
  }

  async fn list_orders(&self) -> Result<Vec<OrderDetails>> {
    let tables = self.tables.read();
    Ok(tables.orders.iter().filter_map(|o| tables.details(o)).collect())
  }

  async fn get_order(&self, id: i64) -> Result<Option<OrderDetails>> {
    let tables = self.tables.read();
    Ok(tables.orders.iter().find(|o| o.id == id).and_then(|o| tables.details(o)))
  }

  async fn create_order(&self, order: NewOrder) -> Result<Order> {
    let mut tables = self.tables.write();
    tables.require_user(order.user_id)?;
    tables.require_products(&order.product_ids)?;
    let row = Order {
      id: tables.next_id(),
      delivery_address: order.delivery_address,
      promocode: order.promocode,
      created_at: Utc::now(),
      user_id: order.user_id,
      receipt: order.receipt,
    };
    tables.link_products(row.id, &order.product_ids);
    tables.orders.push(row.clone());
    Ok(row)
  }

  async fn update_order(&self, id: i64, order: NewOrder) -> Result<Option<Order>> {
    let mut tables = self.tables.write();
    if !tables.orders.iter().any(|o| o.id == id) {
      return Ok(None);
    }
    tables.require_user(order.user_id)?;
    tables.require_products(&order.product_ids)?;
    let Some(existing) = tables.orders.iter_mut().find(|o| o.id == id) else {
      return Ok(None);
    };
    existing.delivery_address = order.delivery_address;
    existing.promocode = order.promocode;
    existing.user_id = order.user_id;
    if order.receipt.is_some() {
      existing.receipt = order.receipt;
    }
    let updated = existing.clone();
    tables.order_products.retain(|(oid, _)| *oid != id);
    tables.link_products(id, &order.product_ids);
    Ok(Some(updated))
  }

  async fn delete_order(&self, id: i64) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.orders.len();
    tables.orders.retain(|o| o.id != id);
    tables.order_products.retain(|(oid, _)| *oid != id);
    Ok(tables.orders.len() != before)
  }

  async fn get_or_create_order(&self, order: NewOrder, catalog: Option<&ProductFilter>) -> Result<OrderUpsert> {
    let mut tables = self.tables.write();
    tables.require_user(order.user_id)?;
    tables.require_products(&order.product_ids)?;
    let mut product_ids = order.product_ids.clone();
    if let Some(filter) = catalog {
      for product in tables.products.iter().filter(|p| filter.matches(p)) {
        if !product_ids.contains(&product.id) {
          product_ids.push(product.id);
        }
      }
    }
    let existing = tables
      .orders
      .iter()
      .find(|o| {
        o.delivery_address == order.delivery_address && o.promocode == order.promocode && o.user_id == order.user_id
      })
      .cloned();
    let (row, created) = match existing {
      Some(row) => (row, false),
      None => {
        let row = Order {
          id: tables.next_id(),
          delivery_address: order.delivery_address,
          promocode: order.promocode,
          created_at: Utc::now(),
          user_id: order.user_id,
          receipt: order.receipt,
        };
        tables.orders.push(row.clone());
        (row, true)
      }
    };
    tables.link_products(row.id, &product_ids);
    Ok(OrderUpsert { order: row, created })
  }

  async fn add_order_products(&self, order_id: i64, product_ids: &[i64]) -> Result<()> {
    let mut tables = self.tables.write();
    if !tables.orders.iter().any(|o| o.id == order_id) {
      return Err(AppError::NotFound(format!("Order {} not found.", order_id)));
    }
    tables.require_products(product_ids)?;
    tables.link_products(order_id, product_ids);
    Ok(())
  }

  async fn first_order(&self) -> Result<Option<Order>> {
    Ok(self.tables.read().orders.iter().min_by_key(|o| o.id).cloned())
  }

  async fn order_totals(&self) -> Result<Vec<OrderTotal>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .iter()
        .map(|order| {
          let prices: Vec<Decimal> = tables
            .order_products
            .range((order.id, i64::MIN)..=(order.id, i64::MAX))
            .filter_map(|(_, pid)| tables.products.iter().find(|p| p.id == *pid).map(|p| p.price))
            .collect();
          OrderTotal {
            order_id: order.id,
            product_count: prices.len() as i64,
            total: prices.into_iter().sum(),
          }
        })
        .collect(),
    )
  }

  async fn create_user(&self, user: NewUser) -> Result<User> {
    let mut tables = self.tables.write();
    if tables.users.iter().any(|u| u.username == user.username) {
      return Err(duplicate_username());
    }
    let row = User {
      id: tables.next_id(),
      username: user.username,
      email: user.email,
      first_name: user.first_name,
      last_name: user.last_name,
      password_hash: user.password_hash,
      is_staff: user.is_staff,
      date_joined: Utc::now(),
    };
    tables.users.push(row.clone());
    Ok(row)
  }

  async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
    Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
  }

  async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
    Ok(self.tables.read().users.iter().find(|u| u.username == username).cloned())
  }

  async fn usernames(&self) -> Result<Vec<String>> {
    let tables = self.tables.read();
    let mut users: Vec<&User> = tables.users.iter().collect();
    users.sort_by_key(|u| u.id);
    Ok(users.into_iter().map(|u| u.username.clone()).collect())
  }

  async fn delete_user(&self, id: i64) -> Result<bool> {
    let mut tables = self.tables.write();
    if tables.orders.iter().any(|o| o.user_id == id) {
      return Err(AppError::Protected(format!("User {} still owns orders.", id)));
    }
    let before = tables.users.len();
    tables.users.retain(|u| u.id != id);
    tables.profiles.retain(|p| p.user_id != id);
    Ok(tables.users.len() != before)
  }

  async fn create_profile(&self, profile: Profile) -> Result<Profile> {
    let mut tables = self.tables.write();
    tables.require_user(profile.user_id)?;
    if tables.profiles.iter().any(|p| p.user_id == profile.user_id) {
      return Err(AppError::Validation(format!("User {} already has a profile.", profile.user_id)));
    }
    tables.profiles.push(profile.clone());
    Ok(profile)
  }

  async fn profile(&self, user_id: i64) -> Result<Option<Profile>> {
    Ok(self.tables.read().profiles.iter().find(|p| p.user_id == user_id).cloned())
  }

  async fn list_groups(&self) -> Result<Vec<Group>> {
    let mut groups = self.tables.read().groups.clone();
    groups.sort_by_key(|g| g.id);
    Ok(groups)
  }

  async fn create_group(&self, name: &str) -> Result<Group> {
    let mut tables = self.tables.write();
    if tables.groups.iter().any(|g| g.name == name) {
      return Err(duplicate_group());
    }
    let group = Group {
      id: tables.next_id(),
      name: name.to_string(),
      permissions: Vec::new(),
    };
    tables.groups.push(group.clone());
    Ok(group)
  }

  async fn list_articles(&self, limit: Option<usize>) -> Result<Vec<Article>> {
    let tables = self.tables.read();
    let mut articles: Vec<Article> = tables.articles.iter().filter(|a| a.published_date.is_some()).cloned().collect();
    articles.sort_by(|a, b| b.published_date.cmp(&a.published_date).then(b.id.cmp(&a.id)));
    if let Some(limit) = limit {
      articles.truncate(limit);
    }
    Ok(articles)
  }

  async fn get_article(&self, id: i64) -> Result<Option<Article>> {
    Ok(self.tables.read().articles.iter().find(|a| a.id == id).cloned())
  }

  async fn create_article(&self, article: NewArticle) -> Result<Article> {
    let mut tables = self.tables.write();
    let row = Article {
      id: tables.next_id(),
      title: article.title,
      body: article.body,
      published_date: article.published_date,
    };
    tables.articles.push(row.clone());
    Ok(row)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_user(username: &str) -> NewUser {
    NewUser {
      username: username.to_string(),
      password_hash: "hash".to_string(),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn listing_applies_filter_and_ordering() {
    let store = MemoryStore::new();
    store.create_product(NewProduct::named("Phone", Decimal::new(500, 0))).await.unwrap();
    store.create_product(NewProduct::named("Desk", Decimal::new(200, 0))).await.unwrap();
    let mut archived = NewProduct::named("Apple", Decimal::new(100, 0));
    archived.archived = true;
    store.create_product(archived).await.unwrap();

    let names: Vec<String> = store
      .list_products(&ProductFilter::active())
      .await
      .unwrap()
      .into_iter()
      .map(|p| p.name)
      .collect();
    assert_eq!(names, vec!["Desk", "Phone"]);

    let filter = ProductFilter {
      search: Some("PHO".to_string()),
      ordering: ProductOrdering::PkDesc,
      ..Default::default()
    };
    let found = store.list_products(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Phone");
  }

  #[tokio::test]
  async fn user_with_orders_is_protected() {
    let store = MemoryStore::new();
    let user = store.create_user(new_user("admin")).await.unwrap();
    let product = store.create_product(NewProduct::named("Desk", Decimal::ONE)).await.unwrap();
    store
      .create_order(NewOrder {
        user_id: user.id,
        product_ids: vec![product.id],
        ..Default::default()
      })
      .await
      .unwrap();
    assert!(matches!(store.delete_user(user.id).await, Err(AppError::Protected(_))));
  }

  #[tokio::test]
  async fn get_or_create_reuses_matching_order() {
    let store = MemoryStore::new();
    let user = store.create_user(new_user("admin")).await.unwrap();
    let a = store.create_product(NewProduct::named("A", Decimal::new(150, 2))).await.unwrap();
    let b = store.create_product(NewProduct::named("B", Decimal::new(250, 2))).await.unwrap();
    let draft = NewOrder {
      delivery_address: "Main st".to_string(),
      promocode: "SALE".to_string(),
      user_id: user.id,
      product_ids: vec![a.id],
      receipt: None,
    };
    let first = store.get_or_create_order(draft.clone(), None).await.unwrap();
    assert!(first.created);
    let catalog = ProductFilter {
      name: Some("B".to_string()),
      ..ProductFilter::default()
    };
    let second = store
      .get_or_create_order(
        NewOrder {
          product_ids: Vec::new(),
          ..draft
        },
        Some(&catalog),
      )
      .await
      .unwrap();
    assert!(!second.created);
    assert_eq!(first.order.id, second.order.id);

    let totals = store.order_totals().await.unwrap();
    assert_eq!(totals[0].product_count, 2);
    assert_eq!(totals[0].total, Decimal::new(400, 2));
  }

  #[tokio::test]
  async fn update_of_a_missing_order_is_none_before_validation() {
    let store = MemoryStore::new();
    let missing = store
      .update_order(
        404,
        NewOrder {
          user_id: 999,
          product_ids: vec![998],
          ..Default::default()
        },
      )
      .await
      .unwrap();
    assert!(missing.is_none());
  }

  #[tokio::test]
  async fn duplicate_username_is_a_form_error() {
    let store = MemoryStore::new();
    store.create_user(new_user("bob")).await.unwrap();
    assert!(matches!(store.create_user(new_user("bob")).await, Err(AppError::Form(_))));
  }
}
