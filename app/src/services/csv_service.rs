// storefront/app/src/services/csv_service.rs

//! Product CSV import and export.

use tracing::{debug, instrument};

use crate::errors::{AppError, Result};
use crate::models::{NewProduct, Product, ProductForm};

/// Columns written by the REST `download_csv` action.
pub const API_EXPORT_FIELDS: &[&str] = &["name", "description", "price", "discount"];

/// Columns written by the admin export: every product column.
pub const ADMIN_EXPORT_FIELDS: &[&str] = &[
  "id",
  "name",
  "description",
  "price",
  "discount",
  "created_at",
  "archived",
  "preview",
];

const IMPORT_FIELDS: &[&str] = &["name", "description", "price", "discount", "archived"];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes a CSV upload into validated products. Nothing is stored here; the
/// caller decides whether the batch goes in.
///
/// The first row is the header. `name` is required; unknown columns and
/// invalid rows fail the whole batch, naming the offending line.
#[instrument(name = "csv_service::parse_products", skip(bytes), fields(size = bytes.len()))]
pub fn parse_products(bytes: &[u8]) -> Result<Vec<NewProduct>> {
  let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
  let mut reader = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(bytes);

  let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
  if let Some(unknown) = headers.iter().find(|h| !IMPORT_FIELDS.contains(&h.as_str())) {
    return Err(AppError::Validation(format!("Unknown CSV column '{}'.", unknown)));
  }
  if !headers.iter().any(|h| h == "name") {
    return Err(AppError::Validation("CSV header must contain a 'name' column.".to_string()));
  }

  let mut products = Vec::new();
  for (index, record) in reader.records().enumerate() {
    let record = record?;
    let form = ProductForm::from_fields(headers.iter().map(String::as_str).zip(record.iter()));
    let product = form.into_new_product().map_err(|e| match e {
      AppError::Form(errors) => AppError::Validation(format!("Line {}: {}", index + 2, errors)),
      other => other,
    })?;
    products.push(product);
  }
  debug!(rows = products.len(), "Parsed product CSV.");
  Ok(products)
}

/// Writes `products` as CSV with a header row of `fields`.
pub fn write_products(products: &[Product], fields: &[&str]) -> Result<Vec<u8>> {
  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(fields)?;
  for product in products {
    writer.write_record(fields.iter().map(|field| field_value(product, field)))?;
  }
  writer
    .into_inner()
    .map_err(|e| AppError::Internal(format!("Failed to flush CSV writer: {}", e)))
}

fn field_value(product: &Product, field: &str) -> String {
  match field {
    "id" | "pk" => product.id.to_string(),
    "name" => product.name.clone(),
    "description" => product.description.clone(),
    "price" => product.price.to_string(),
    "discount" => product.discount.to_string(),
    "created_at" => product.created_at.to_rfc3339(),
    "archived" => if product.archived { "True" } else { "False" }.to_string(),
    "preview" => product.preview.clone().unwrap_or_default(),
    _ => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use rust_decimal::Decimal;

  #[test]
  fn parses_rows_with_bom_and_optional_columns() {
    let data = "\u{feff}name,description,price,discount\nTable,Oak,100.5,5\nChair,,20,0\n";
    let products = parse_products(data.as_bytes()).unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Table");
    assert_eq!(products[0].price.to_string(), "100.50");
    assert_eq!(products[0].discount, 5);
    assert_eq!(products[1].description, "");
    assert!(!products[1].archived);
  }

  #[test]
  fn bad_row_names_the_line() {
    let data = "name,price\nTable,10\nChair,abc\n";
    match parse_products(data.as_bytes()) {
      Err(AppError::Validation(message)) => assert!(message.starts_with("Line 3:"), "{}", message),
      other => panic!("unexpected: {:?}", other),
    }
  }

  #[test]
  fn unknown_column_is_rejected() {
    assert!(matches!(
      parse_products(b"name,colour\nTable,red\n"),
      Err(AppError::Validation(_))
    ));
  }

  #[test]
  fn api_export_has_header_and_rows() {
    let product = Product {
      id: 1,
      name: "Lamp, desk".to_string(),
      description: "Bright".to_string(),
      price: Decimal::new(1999, 2),
      discount: 0,
      created_at: Utc::now(),
      archived: false,
      preview: None,
    };
    let out = String::from_utf8(write_products(&[product], API_EXPORT_FIELDS).unwrap()).unwrap();
    assert_eq!(out, "name,description,price,discount\n\"Lamp, desk\",Bright,19.99,0\n");
  }
}
