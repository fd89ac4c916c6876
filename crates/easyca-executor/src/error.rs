//! Execution errors.
//!
//! Step failures (non-zero exit, timeout) are not errors at this level;
//! they are recorded in the [`ExecutionReport`](crate::ExecutionReport).
//! This type covers faults of the engine itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
  /// Execution was cancelled between steps.
  #[error("workflow execution cancelled")]
  Cancelled,

  /// The step's process could not be spawned at all.
  #[error("failed to spawn step '{step}': {source}")]
  Spawn {
    step: String,
    #[source]
    source: std::io::Error,
  },
}
