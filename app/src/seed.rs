// storefront/app/src/seed.rs

//! Demo catalog and blog content for local runs (`SEED_DB=true`).

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::errors::Result;
use crate::models::{NewArticle, NewProduct};
use crate::storage::{ProductFilter, Store};

/// Inserts demo rows unless the catalog already has products.
#[instrument(name = "seed::seed_demo_data", skip(store))]
pub async fn seed_demo_data(store: &dyn Store) -> Result<bool> {
  if !store.list_products(&ProductFilter::default()).await?.is_empty() {
    info!("Catalog not empty, skipping seed.");
    return Ok(false);
  }

  let products = vec![
    NewProduct {
      description: "15 inch, 16 GB RAM".to_string(),
      ..NewProduct::named("Laptop", Decimal::new(199900, 2))
    },
    NewProduct {
      description: "Tower with a discrete GPU".to_string(),
      discount: 5,
      ..NewProduct::named("Desktop", Decimal::new(299900, 2))
    },
    NewProduct::named("Smartphone_1", Decimal::new(19999, 2)),
    NewProduct::named("Smartphone_2", Decimal::new(29999, 2)),
    NewProduct::named("Smartphone_3", Decimal::new(39999, 2)),
  ];
  store.create_products(products).await?;

  let now = Utc::now();
  for (days_ago, title, body) in [
    (3, "Opening day", "The shop is open. Laptops, desktops and phones are in stock."),
    (1, "Spring discounts", "Every smartphone is 15 percent off until the end of the month."),
  ] {
    store
      .create_article(NewArticle {
        title: title.to_string(),
        body: body.to_string(),
        published_date: Some(now - Duration::days(days_ago)),
      })
      .await?;
  }
  store
    .create_article(NewArticle {
      title: "Draft: summer plans".to_string(),
      body: String::new(),
      published_date: None,
    })
    .await?;

  info!("Demo data seeded.");
  Ok(true)
}
