// storefront/app/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::errors::{FormErrors, Result};

pub const NAME_MAX_LEN: usize = 100;
const PRICE_MAX_DIGITS: u32 = 8;
const PRICE_DECIMAL_PLACES: u32 = 2;
const SHORT_DESCRIPTION_LEN: usize = 40;

/// Catalog entry. Listed by name, then price, unless a view asks otherwise.
/// `archived` is the soft-delete flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub price: Decimal,
  pub discount: i32,
  pub created_at: DateTime<Utc>,
  pub archived: bool,
  pub preview: Option<String>,
}

impl Product {
  /// First 40 characters of the description, with "..." when it was cut.
  pub fn description_short(&self) -> String {
    if self.description.chars().count() > SHORT_DESCRIPTION_LEN {
      let head: String = self.description.chars().take(SHORT_DESCRIPTION_LEN).collect();
      format!("{}...", head)
    } else {
      self.description.clone()
    }
  }

  pub fn preview_dir(id: i64) -> String {
    format!("products/product_{}/preview", id)
  }

  pub fn images_dir(id: i64) -> String {
    format!("products/product_{}/images", id)
  }
}

impl fmt::Display for Product {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Product(pk={}, name={:?})", self.id, self.name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProductImage {
  pub id: i64,
  pub product_id: i64,
  pub image: String,
  pub description: String,
}

/// Validated fields for a product insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub price: Decimal,
  #[serde(default)]
  pub discount: i32,
  #[serde(default)]
  pub archived: bool,
}

impl NewProduct {
  pub fn named(name: impl Into<String>, price: Decimal) -> Self {
    Self {
      name: name.into(),
      description: String::new(),
      price,
      discount: 0,
      archived: false,
    }
  }

  /// Checks lengths and the price shape; rescales the price to two places.
  pub fn validated(mut self) -> Result<Self> {
    let mut errors = FormErrors::new();
    self.name = self.name.trim().to_string();
    check_name(&self.name, &mut errors);
    match normalize_price(self.price) {
      Ok(price) => self.price = price,
      Err(message) => errors.add("price", message),
    }
    errors.into_result()?;
    Ok(self)
  }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductChanges {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<Decimal>,
  pub discount: Option<i32>,
  pub archived: Option<bool>,
  #[serde(skip)]
  pub preview: Option<String>,
}

impl ProductChanges {
  pub fn validated(mut self) -> Result<Self> {
    let mut errors = FormErrors::new();
    if let Some(name) = self.name.take() {
      let name = name.trim().to_string();
      check_name(&name, &mut errors);
      self.name = Some(name);
    }
    if let Some(price) = self.price {
      match normalize_price(price) {
        Ok(price) => self.price = Some(price),
        Err(message) => errors.add("price", message),
      }
    }
    errors.into_result()?;
    Ok(self)
  }

  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.description.is_none()
      && self.price.is_none()
      && self.discount.is_none()
      && self.archived.is_none()
      && self.preview.is_none()
  }

  pub fn apply_to(&self, product: &mut Product) {
    if let Some(name) = &self.name {
      product.name = name.clone();
    }
    if let Some(description) = &self.description {
      product.description = description.clone();
    }
    if let Some(price) = self.price {
      product.price = price;
    }
    if let Some(discount) = self.discount {
      product.discount = discount;
    }
    if let Some(archived) = self.archived {
      product.archived = archived;
    }
    if let Some(preview) = &self.preview {
      product.preview = Some(preview.clone());
    }
  }
}

/// Raw, string-typed product form as posted by a browser.
///
/// Missing `price`/`discount` fall back to 0 and a missing `archived`
/// checkbox means `false`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<String>,
  pub discount: Option<String>,
  pub archived: Option<String>,
}

impl ProductForm {
  pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
    let mut form = Self::default();
    for (key, value) in fields {
      let value = Some(value.to_string());
      match key {
        "name" => form.name = value,
        "description" => form.description = value,
        "price" => form.price = value,
        "discount" => form.discount = value,
        "archived" => form.archived = value,
        _ => {}
      }
    }
    form
  }

  pub fn into_new_product(self) -> Result<NewProduct> {
    let mut errors = FormErrors::new();
    let name = self.name.as_deref().map(str::trim).unwrap_or_default().to_string();
    let price = parse_price(self.price.as_deref(), &mut errors);
    let discount = parse_discount(self.discount.as_deref(), &mut errors);
    check_name(&name, &mut errors);
    errors.into_result()?;
    Ok(NewProduct {
      name,
      description: self.description.unwrap_or_default(),
      price: price.unwrap_or_default(),
      discount: discount.unwrap_or_default(),
      archived: parse_checkbox(self.archived.as_deref()),
    })
  }

  /// Every field of the form is written back, matching a full form submit.
  pub fn into_changes(self) -> Result<ProductChanges> {
    let product = self.into_new_product()?;
    Ok(ProductChanges {
      name: Some(product.name),
      description: Some(product.description),
      price: Some(product.price),
      discount: Some(product.discount),
      archived: Some(product.archived),
      preview: None,
    })
  }
}

/// `Product.objects.aggregate(...)`-style summary over a price column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct PriceStats {
  pub count: i64,
  pub avg: Option<Decimal>,
  pub min: Option<Decimal>,
  pub max: Option<Decimal>,
}

fn check_name(name: &str, errors: &mut FormErrors) {
  let len = name.chars().count();
  if len == 0 {
    errors.add("name", "This field is required.");
  } else if len > NAME_MAX_LEN {
    errors.add(
      "name",
      format!("Ensure this value has at most {} characters (it has {}).", NAME_MAX_LEN, len),
    );
  }
}

fn parse_price(raw: Option<&str>, errors: &mut FormErrors) -> Option<Decimal> {
  let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
  match Decimal::from_str(raw) {
    Ok(price) => match normalize_price(price) {
      Ok(price) => Some(price),
      Err(message) => {
        errors.add("price", message);
        None
      }
    },
    Err(_) => {
      errors.add("price", "Enter a number.");
      None
    }
  }
}

fn parse_discount(raw: Option<&str>, errors: &mut FormErrors) -> Option<i32> {
  let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
  match raw.parse::<i32>() {
    Ok(discount) => Some(discount),
    Err(_) => {
      errors.add("discount", "Enter a whole number.");
      None
    }
  }
}

pub(crate) fn parse_checkbox(raw: Option<&str>) -> bool {
  matches!(
    raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
    Some("on" | "true" | "1" | "yes")
  )
}

/// Enforces `max_digits=8, decimal_places=2` and pads to two places.
pub fn normalize_price(price: Decimal) -> std::result::Result<Decimal, String> {
  let price = price.normalize();
  if price.scale() > PRICE_DECIMAL_PLACES {
    return Err(format!(
      "Ensure that there are no more than {} decimal places.",
      PRICE_DECIMAL_PLACES
    ));
  }
  let limit = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
  if price.abs() >= limit {
    return Err(format!(
      "Ensure that there are no more than {} digits in total.",
      PRICE_MAX_DIGITS
    ));
  }
  let mut price = price;
  price.rescale(PRICE_DECIMAL_PLACES);
  Ok(price)
}
