// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use shopflow::{Ctx, FlowError, Handler, Step};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct OrderDraft {
  pub lines: Vec<String>,
  pub total_cents: i64,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub express: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(err.to_string())
  }
}

/// Records `step` in the trail, adds `cents` and honours `stop_at`.
pub fn recording_handler(step: &'static str, cents: i64) -> Handler<OrderDraft, TestError> {
  Box::new(move |ctx: Ctx<OrderDraft>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.trail.push(step.to_string());
      guard.total_cents += cents;
      if guard.stop_at.as_deref() == Some(step) {
        return Ok(Step::Stop);
      }
      Ok(Step::Continue)
    })
  })
}

pub fn failing_handler(step: &'static str, message: &'static str) -> Handler<OrderDraft, TestError> {
  Box::new(move |ctx: Ctx<OrderDraft>| {
    Box::pin(async move {
      ctx.write().trail.push(step.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
