// shopflow/src/control.rs

//! Flow-control signals returned by handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  /// Keep going with the remaining handlers and steps.
  Continue,
  /// Halt the pipeline right after this handler.
  Stop,
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// Every step was executed or legitimately skipped.
  Completed,
  /// A handler returned [`Step::Stop`].
  Stopped,
}

impl Outcome {
  pub fn is_completed(self) -> bool {
    matches!(self, Outcome::Completed)
  }
}
