// shopflow/src/pipeline/execution.rs

//! `Pipeline::run()`: walks the steps in order and drives their handlers.

use crate::context::Ctx;
use crate::control::{Outcome, Step};
use crate::error::FlowError;
use crate::pipeline::definition::{Handler, Pipeline, StepSlot};
use std::fmt;
use tracing::{debug, error, info, info_span, instrument, trace, warn, Instrument};

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    })
  }
}

impl<TData: Send + Sync + 'static, Err> StepSlot<TData, Err> {
  fn handlers(&self, phase: Phase) -> &[Handler<TData, Err>] {
    match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    }
  }
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: Send + Sync + 'static,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes every step against `ctx`.
  ///
  /// The first error from a required step aborts the run. Errors from
  /// optional steps are logged and the run moves on to the next step.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = %self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: Ctx<TData>) -> Result<Outcome, Err> {
    debug!("Pipeline execution starting.");

    for (step_index, slot) in self.steps.iter().enumerate() {
      let span = info_span!(
        "pipeline_step",
        step = %slot.name,
        step_index,
        optional = slot.optional
      );
      match self.run_step(slot, ctx.clone()).instrument(span).await? {
        Step::Continue => {}
        Step::Stop => {
          info!(step = %slot.name, "Pipeline stopped by a handler.");
          return Ok(Outcome::Stopped);
        }
      }
    }

    debug!("Pipeline execution completed.");
    Ok(Outcome::Completed)
  }

  async fn run_step(&self, slot: &StepSlot<TData, Err>, ctx: Ctx<TData>) -> Result<Step, Err> {
    if let Some(condition) = &slot.skip_if {
      let skip = {
        let guard = ctx.read();
        condition(&guard)
      };
      if skip {
        info!("Step skipped by its skip condition.");
        return Ok(Step::Continue);
      }
    }

    if !slot.has_handlers() {
      if slot.optional {
        debug!("Optional step has no handlers, skipping.");
        return Ok(Step::Continue);
      }
      error!("Required step has no handlers.");
      return Err(Err::from(FlowError::HandlerMissing {
        pipeline: self.name.clone(),
        step: slot.name.clone(),
      }));
    }

    for phase in [Phase::Before, Phase::On, Phase::After] {
      for (handler_index, handler) in slot.handlers(phase).iter().enumerate() {
        trace!(%phase, handler_index, "Running handler.");
        match handler(ctx.clone()).await {
          Ok(Step::Continue) => {}
          Ok(Step::Stop) => {
            debug!(%phase, handler_index, "Handler requested stop.");
            return Ok(Step::Stop);
          }
          Err(e) if slot.optional => {
            warn!(%phase, handler_index, error = %e, "Optional step failed; continuing.");
            return Ok(Step::Continue);
          }
          Err(e) => {
            error!(%phase, handler_index, error = %e, "Handler failed.");
            return Err(e);
          }
        }
      }
    }

    Ok(Step::Continue)
  }
}
