// shopflow/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step '{step}' is not defined in pipeline '{pipeline}'")]
  StepNotFound { pipeline: String, step: String },

  #[error("Step '{step}' is already defined in pipeline '{pipeline}'")]
  DuplicateStep { pipeline: String, step: String },

  #[error("No handlers registered for required step '{step}' of pipeline '{pipeline}'")]
  HandlerMissing { pipeline: String, step: String },

  #[error("No pipeline registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("Context handed to pipeline '{pipeline}' is not a {expected}")]
  TypeMismatch { pipeline: String, expected: String },

  #[error("Handler failed: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::Handler { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
