// storefront/app/src/pipelines/mod.rs

//! Multi-step business workflows, built on `shopflow` pipelines.

use shopflow::Workflows;
use tracing::info;

use crate::errors::{AppError, Result as AppResult};

pub mod contexts;
pub mod csv_import_pipeline;
pub mod order_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Builds every workflow and registers it. Called once at startup by the
/// server and by the CLI.
pub fn register_all_pipelines(workflows: &Workflows<AppError>) -> AppResult<()> {
  info!("Registering workflows...");
  workflows.register(signup_pipeline::build()?);
  workflows.register(signin_pipeline::build()?);
  workflows.register(csv_import_pipeline::build()?);
  workflows.register(order_pipeline::build()?);
  info!(count = workflows.len(), "All workflows registered.");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipelines::contexts::{PlaceOrderCtxData, SignupCtxData};

  #[test]
  fn every_workflow_is_registered() {
    let workflows = Workflows::<AppError>::new();
    register_all_pipelines(&workflows).unwrap();
    assert_eq!(workflows.len(), 4);
    assert!(workflows.is_registered::<SignupCtxData>());
    assert!(workflows.is_registered::<PlaceOrderCtxData>());
  }
}
