// storefront/app/src/lib.rs

//! Storefront: product catalog, orders, accounts and a small blog served over
//! actix-web, with operator tasks in the `storefront_manage` binary.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod web;

pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use state::AppState;
