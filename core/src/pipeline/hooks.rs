// shopflow/src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` handlers.
//!
//! A handler may fail with any error convertible into the pipeline's `Err`,
//! so storage or service errors can be bubbled with `?` inside handlers.

use crate::context::Ctx;
use crate::control::Step;
use crate::error::{FlowError, FlowResult};
use crate::pipeline::definition::{Handler, Pipeline};
use std::future::Future;

impl<TData, Err> Pipeline<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn before<F, Fut, HandlerErr>(&mut self, step: &str, handler: F) -> FlowResult<()>
  where
    F: Fn(Ctx<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Step, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + 'static,
  {
    self.slot_mut(step)?.before.push(boxed(handler));
    Ok(())
  }

  pub fn on<F, Fut, HandlerErr>(&mut self, step: &str, handler: F) -> FlowResult<()>
  where
    F: Fn(Ctx<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Step, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + 'static,
  {
    self.slot_mut(step)?.on.push(boxed(handler));
    Ok(())
  }

  pub fn after<F, Fut, HandlerErr>(&mut self, step: &str, handler: F) -> FlowResult<()>
  where
    F: Fn(Ctx<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Step, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + 'static,
  {
    self.slot_mut(step)?.after.push(boxed(handler));
    Ok(())
  }
}

fn boxed<TData, Err, F, Fut, HandlerErr>(handler: F) -> Handler<TData, Err>
where
  TData: Send + Sync + 'static,
  F: Fn(Ctx<TData>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Step, HandlerErr>> + Send + 'static,
  HandlerErr: Into<Err> + 'static,
{
  Box::new(move |ctx| {
    let fut = handler(ctx);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}
