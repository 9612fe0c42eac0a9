// shopflow/src/lib.rs

//! Shopflow: small asynchronous step pipelines for storefront workflows.
//!
//! A pipeline is an ordered list of named steps run over a shared context:
//!  - each step may carry `before`, `on` and `after` handlers,
//!  - handlers may stop the pipeline early by returning [`Step::Stop`],
//!  - optional steps may be left without handlers and never fail the run,
//!  - steps can be skipped by a condition evaluated against the context.
//!
//! [`Workflows`] keeps one pipeline per context type so callers can dispatch
//! by handing over a [`Ctx`] alone.

pub mod context;
pub mod control;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::context::Ctx;
pub use crate::control::{Outcome, Step};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::{Handler, Pipeline, SkipCondition};
pub use crate::registry::Workflows;
