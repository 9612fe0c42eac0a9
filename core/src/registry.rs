// shopflow/src/registry.rs

//! `Workflows<Err>`: one pipeline per context type, dispatched by `TypeId`.

use crate::context::Ctx;
use crate::control::Outcome;
use crate::error::FlowError;
use crate::pipeline::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[async_trait]
trait ErasedPipeline<Err>: Send + Sync {
  fn name(&self) -> &str;

  /// `ctx` must hold a `Ctx<TData>` for the wrapped pipeline's `TData`.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, Err>;
}

struct Typed<TData: Send + Sync + 'static, Err>(Pipeline<TData, Err>);

#[async_trait]
impl<TData, Err> ErasedPipeline<Err> for Typed<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn name(&self) -> &str {
    self.0.name()
  }

  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, Err> {
    let ctx = ctx.downcast::<Ctx<TData>>().map_err(|_| {
      error!(pipeline = %self.0.name(), "Context type mismatch.");
      Err::from(FlowError::TypeMismatch {
        pipeline: self.0.name().to_string(),
        expected: type_name::<Ctx<TData>>().to_string(),
      })
    })?;
    self.0.run(*ctx).await
  }
}

/// Type-keyed pipeline registry.
pub struct Workflows<Err> {
  pipelines: RwLock<HashMap<TypeId, Arc<dyn ErasedPipeline<Err>>>>,
}

impl<Err> Workflows<Err>
where
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for its context type, replacing any previous one.
  /// Returns the name of the replaced pipeline.
  pub fn register<TData>(&self, pipeline: Pipeline<TData, Err>) -> Option<String>
  where
    TData: Send + Sync + 'static,
  {
    debug!(pipeline = %pipeline.name(), context_type = %type_name::<TData>(), "Registering pipeline.");
    let previous = self
      .pipelines
      .write()
      .insert(TypeId::of::<TData>(), Arc::new(Typed(pipeline)));
    previous.map(|p| p.name().to_string())
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.pipelines.read().contains_key(&TypeId::of::<TData>())
  }

  pub fn len(&self) -> usize {
    self.pipelines.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Runs the pipeline registered for `TData`.
  #[instrument(name = "Workflows::run", skip_all, fields(context_type = %type_name::<TData>()))]
  pub async fn run<TData>(&self, ctx: Ctx<TData>) -> Result<Outcome, Err>
  where
    TData: Send + Sync + 'static,
  {
    let runner = self.pipelines.read().get(&TypeId::of::<TData>()).cloned();
    let runner = runner.ok_or_else(|| {
      error!("No pipeline registered for this context type.");
      Err::from(FlowError::NotRegistered {
        context_type: type_name::<TData>().to_string(),
      })
    })?;
    runner.run_erased(Box::new(ctx)).await
  }
}

impl<Err> Default for Workflows<Err>
where
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
