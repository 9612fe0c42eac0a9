// storefront/app/src/bin/manage.rs

//! Operator commands run against the configured database.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shopflow::Workflows;
use std::sync::Arc;

use storefront_app::errors::AppError;
use storefront_app::models::{NewUser, Profile};
use storefront_app::pipelines::contexts::OrderRequest;
use storefront_app::pipelines::{order_pipeline, register_all_pipelines};
use storefront_app::services::auth_service;
use storefront_app::storage::{PgStore, ProductFilter, Store};
use storefront_app::telemetry::init_tracing;
use storefront_app::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "storefront_manage", about = "Storefront maintenance commands")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Place an order for the catalog, reusing an identical existing one.
  CreateOrder {
    #[arg(long, default_value = "admin")]
    username: String,
    #[arg(long, default_value = "Lenina Prospekt, 2, 22, Yekaterinburg, Sverdlovsk Oblast, 620014")]
    address: String,
    #[arg(long, default_value = "SALE5936")]
    promocode: String,
    /// Only link products whose name contains this fragment.
    #[arg(long)]
    products: Option<String>,
  },
  /// Add every product to the first order.
  UpdateOrder,
  /// Set the discount of products whose name contains `name`.
  BulkDiscount {
    #[arg(long, default_value = "Smartphone")]
    name: String,
    #[arg(long, default_value_t = 15)]
    discount: i32,
  },
  /// Count, average, min and max price of matching products.
  PriceStats {
    #[arg(long)]
    name: Option<String>,
  },
  /// Product count and price sum per order.
  OrderTotals,
  /// Print pk and name of every product and every username.
  SelectFields,
  CreateUser {
    username: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long)]
    staff: bool,
  },
  /// Apply pending migrations.
  Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let config = AppConfig::from_env().context("loading configuration")?;
  init_tracing(config.log_format);

  let Some(database_url) = config.database_url.as_deref() else {
    bail!("DATABASE_URL must be set for management commands");
  };
  let pg = Arc::new(PgStore::connect(database_url).await.context("connecting to the database")?);
  let store: Arc<dyn Store> = pg.clone();

  match cli.command {
    Command::CreateOrder {
      username,
      address,
      promocode,
      products,
    } => {
      let workflows = Workflows::<AppError>::new();
      register_all_pipelines(&workflows)?;
      let request = OrderRequest {
        username,
        delivery_address: address,
        promocode,
        product_name: products,
      };
      let upsert = order_pipeline::place_order(&workflows, store, request).await?;
      let verb = if upsert.created { "Created" } else { "Found existing" };
      println!("{} order #{}", verb, upsert.order.id);
    }
    Command::UpdateOrder => {
      let Some(order) = store.first_order().await? else {
        bail!("No orders to update");
      };
      let ids: Vec<i64> = store
        .list_products(&ProductFilter::default())
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
      store.add_order_products(order.id, &ids).await?;
      println!("Order #{} now lists {} products", order.id, ids.len());
    }
    Command::BulkDiscount { name, discount } => {
      let updated = store.apply_discount(&name, discount).await?;
      println!("Set discount {}% on {} products matching {:?}", discount, updated, name);
    }
    Command::PriceStats { name } => {
      let stats = store.price_stats(name.as_deref()).await?;
      println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Command::OrderTotals => {
      for total in store.order_totals().await? {
        println!(
          "Order #{}: {} products, total {}",
          total.order_id, total.product_count, total.total
        );
      }
    }
    Command::SelectFields => {
      for product in store.list_products(&ProductFilter::by_pk()).await? {
        println!("{}: {}", product.id, product.name);
      }
      for username in store.usernames().await? {
        println!("user: {}", username);
      }
    }
    Command::CreateUser {
      username,
      password,
      email,
      staff,
    } => {
      let password_hash = auth_service::hash_password(&password)?;
      let user = store
        .create_user(NewUser {
          username,
          email,
          password_hash,
          is_staff: staff,
          ..NewUser::default()
        })
        .await?;
      store
        .create_profile(Profile {
          user_id: user.id,
          ..Profile::default()
        })
        .await?;
      println!("Created user {} (pk={}, staff={})", user.username, user.id, user.is_staff);
    }
    Command::Migrate => {
      pg.migrate().await?;
      println!("Migrations applied");
    }
  }
  Ok(())
}
