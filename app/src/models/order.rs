// storefront/app/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::{FormErrors, Result};
use crate::models::product::Product;
use crate::models::user::UserSummary;

pub const PROMOCODE_MAX_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
  pub id: i64,
  pub delivery_address: String,
  pub promocode: String,
  pub created_at: DateTime<Utc>,
  pub user_id: i64,
  pub receipt: Option<String>,
}

/// An order with its owner and products resolved, as list/detail views show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
  #[serde(flatten)]
  pub order: Order,
  pub user: UserSummary,
  pub products: Vec<Product>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
  pub delivery_address: String,
  pub promocode: String,
  pub user_id: i64,
  pub product_ids: Vec<i64>,
  /// Stored media path of an uploaded receipt; `None` keeps the current one.
  #[serde(default)]
  pub receipt: Option<String>,
}

/// Row of the `order-totals` report.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OrderTotal {
  pub order_id: i64,
  pub product_count: i64,
  pub total: Decimal,
}

/// Order form fields. `products` may repeat, so this is built from raw pairs
/// rather than `web::Form`.
#[derive(Debug, Clone, Default)]
pub struct OrderForm {
  pub delivery_address: Option<String>,
  pub promocode: Option<String>,
  pub user: Option<String>,
  pub products: Vec<String>,
}

impl OrderForm {
  pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: AsRef<str>,
    V: Into<String>,
  {
    let mut form = Self::default();
    for (key, value) in pairs {
      match key.as_ref() {
        "delivery_address" => form.delivery_address = Some(value.into()),
        "promocode" => form.promocode = Some(value.into()),
        "user" => form.user = Some(value.into()),
        "products" => form.products.push(value.into()),
        _ => {}
      }
    }
    form
  }

  /// Shape checks only; whether the user and products exist is up to the caller.
  pub fn into_new_order(self) -> Result<NewOrder> {
    let mut errors = FormErrors::new();

    let promocode = self.promocode.unwrap_or_default().trim().to_string();
    if promocode.chars().count() > PROMOCODE_MAX_LEN {
      errors.add(
        "promocode",
        format!(
          "Ensure this value has at most {} characters (it has {}).",
          PROMOCODE_MAX_LEN,
          promocode.chars().count()
        ),
      );
    }

    let user_id = match self.user.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      None => {
        errors.add("user", "This field is required.");
        0
      }
      Some(raw) => raw.parse::<i64>().unwrap_or_else(|_| {
        errors.add("user", "Select a valid choice. That choice is not one of the available choices.");
        0
      }),
    };

    let mut product_ids = Vec::with_capacity(self.products.len());
    for raw in &self.products {
      match raw.trim().parse::<i64>() {
        Ok(id) if !product_ids.contains(&id) => product_ids.push(id),
        Ok(_) => {}
        Err(_) => errors.add("products", format!("\u{201c}{}\u{201d} is not a valid value.", raw)),
      }
    }
    if self.products.is_empty() {
      errors.add("products", "This field is required.");
    }

    errors.into_result()?;
    Ok(NewOrder {
      delivery_address: self.delivery_address.unwrap_or_default(),
      promocode,
      user_id,
      product_ids,
      receipt: None,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::AppError;

  #[test]
  fn repeated_products_are_collected_once() {
    let order = OrderForm::from_pairs([
      ("delivery_address", "Main st 1"),
      ("user", "3"),
      ("products", "1"),
      ("products", "2"),
      ("products", "1"),
    ])
    .into_new_order()
    .unwrap();
    assert_eq!(order.user_id, 3);
    assert_eq!(order.product_ids, vec![1, 2]);
    assert_eq!(order.promocode, "");
  }

  #[test]
  fn missing_user_and_products_are_reported() {
    let err = OrderForm::from_pairs([("promocode", "X".repeat(21))]).into_new_order().unwrap_err();
    let AppError::Form(errors) = err else {
      panic!("expected form errors");
    };
    assert!(errors.get("user").is_some());
    assert!(errors.get("products").is_some());
    assert!(errors.get("promocode").is_some());
  }
}
