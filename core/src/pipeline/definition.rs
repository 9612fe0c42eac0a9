// shopflow/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and the methods that shape its step list.

use crate::context::Ctx;
use crate::control::Step;
use crate::error::{FlowError, FlowResult};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed asynchronous step handler.
///
/// It receives a clone of the shared context and resolves to a [`Step`]
/// signal or the pipeline's error type.
pub type Handler<TData, Err> =
  Box<dyn Fn(Ctx<TData>) -> Pin<Box<dyn Future<Output = Result<Step, Err>> + Send>> + Send + Sync>;

/// Evaluated under a read lock right before a step runs; `true` skips it.
pub type SkipCondition<TData> = Arc<dyn Fn(&TData) -> bool + Send + Sync>;

pub(crate) struct StepSlot<TData: Send + Sync + 'static, Err> {
  pub(crate) name: String,
  pub(crate) optional: bool,
  pub(crate) skip_if: Option<SkipCondition<TData>>,
  pub(crate) before: Vec<Handler<TData, Err>>,
  pub(crate) on: Vec<Handler<TData, Err>>,
  pub(crate) after: Vec<Handler<TData, Err>>,
}

impl<TData: Send + Sync + 'static, Err> StepSlot<TData, Err> {
  fn new(name: String, optional: bool) -> Self {
    Self {
      name,
      optional,
      skip_if: None,
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }

  pub(crate) fn has_handlers(&self) -> bool {
    !(self.before.is_empty() && self.on.is_empty() && self.after.is_empty())
  }
}

/// An ordered list of named steps run over a `Ctx<TData>`.
///
/// Handlers return `Result<Step, Err>`; framework failures (missing handlers,
/// unknown steps at run time) reach callers through `Err: From<FlowError>`.
pub struct Pipeline<TData: Send + Sync + 'static, Err> {
  pub(crate) name: String,
  pub(crate) steps: Vec<StepSlot<TData, Err>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates an empty pipeline. Steps are added with [`Pipeline::add_step`].
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      steps: Vec::new(),
    }
  }

  /// Creates a pipeline from `(step_name, optional)` pairs, in order.
  pub fn with_steps(name: impl Into<String>, steps: &[(&str, bool)]) -> FlowResult<Self> {
    let mut pipeline = Self::new(name);
    for (step, optional) in steps {
      pipeline.add_step(*step, *optional)?;
    }
    Ok(pipeline)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Appends a step at the end of the pipeline.
  pub fn add_step(&mut self, step: impl Into<String>, optional: bool) -> FlowResult<()> {
    let step = step.into();
    self.ensure_absent(&step)?;
    self.steps.push(StepSlot::new(step, optional));
    Ok(())
  }

  pub fn insert_before(&mut self, existing: &str, step: impl Into<String>, optional: bool) -> FlowResult<()> {
    let idx = self.position(existing)?;
    let step = step.into();
    self.ensure_absent(&step)?;
    self.steps.insert(idx, StepSlot::new(step, optional));
    Ok(())
  }

  pub fn insert_after(&mut self, existing: &str, step: impl Into<String>, optional: bool) -> FlowResult<()> {
    let idx = self.position(existing)?;
    let step = step.into();
    self.ensure_absent(&step)?;
    self.steps.insert(idx + 1, StepSlot::new(step, optional));
    Ok(())
  }

  /// Removes a step together with its handlers. Returns whether it existed.
  pub fn remove_step(&mut self, step: &str) -> bool {
    match self.steps.iter().position(|s| s.name == step) {
      Some(idx) => {
        self.steps.remove(idx);
        true
      }
      None => false,
    }
  }

  pub fn set_optional(&mut self, step: &str, optional: bool) -> FlowResult<()> {
    self.slot_mut(step)?.optional = optional;
    Ok(())
  }

  pub fn skip_if(
    &mut self,
    step: &str,
    condition: impl Fn(&TData) -> bool + Send + Sync + 'static,
  ) -> FlowResult<()> {
    self.slot_mut(step)?.skip_if = Some(Arc::new(condition));
    Ok(())
  }

  pub(crate) fn slot_mut(&mut self, step: &str) -> FlowResult<&mut StepSlot<TData, Err>> {
    let idx = self.position(step)?;
    Ok(&mut self.steps[idx])
  }

  fn position(&self, step: &str) -> FlowResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name == step)
      .ok_or_else(|| FlowError::StepNotFound {
        pipeline: self.name.clone(),
        step: step.to_string(),
      })
  }

  fn ensure_absent(&self, step: &str) -> FlowResult<()> {
    if self.steps.iter().any(|s| s.name == step) {
      return Err(FlowError::DuplicateStep {
        pipeline: self.name.clone(),
        step: step.to_string(),
      });
    }
    Ok(())
  }
}

impl<TData: Send + Sync + 'static, Err> fmt::Debug for Pipeline<TData, Err> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let steps: Vec<_> = self
      .steps
      .iter()
      .map(|s| (s.name.as_str(), s.optional, s.skip_if.is_some()))
      .collect();
    f.debug_struct("Pipeline")
      .field("name", &self.name)
      .field("steps", &steps)
      .finish()
  }
}
