//! Execution reports.

use serde::{Deserialize, Serialize};

/// Outcome of one step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  /// Completion marker already existed; the step was not run.
  Skipped,
  /// The step ran and exited zero.
  Succeeded,
  /// The step ran and exited non-zero, or timed out.
  Failed,
  /// Never attempted because an earlier step failed.
  Aborted,
}

/// Why a process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
  /// Normal exit with this code.
  Code(i32),
  /// Killed by a signal.
  Signal,
  /// Exceeded the step timeout; the process tree was terminated.
  Timeout,
}

impl ExitReason {
  pub fn is_success(&self) -> bool {
    matches!(self, ExitReason::Code(0))
  }
}

impl std::fmt::Display for ExitReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ExitReason::Code(code) => write!(f, "exit code {code}"),
      ExitReason::Signal => write!(f, "killed by signal"),
      ExitReason::Timeout => write!(f, "timed out"),
    }
  }
}

/// Diagnostic detail for the first failed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetail {
  pub step: String,
  pub command: String,
  pub reason: ExitReason,
  /// Tail of the captured stderr.
  pub stderr: String,
}

/// Per-step outcome of a whole run, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
  pub instance: String,
  pub statuses: Vec<(String, StepStatus)>,
  /// Detail for the first failure, if any step failed.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure: Option<FailureDetail>,
}

impl ExecutionReport {
  /// Status of a step by name.
  pub fn status(&self, step: &str) -> Option<StepStatus> {
    self
      .statuses
      .iter()
      .find(|(name, _)| name == step)
      .map(|(_, status)| *status)
  }

  /// True when no step failed.
  pub fn is_success(&self) -> bool {
    self.failure.is_none()
  }

  /// Number of steps with the given status.
  pub fn count(&self, status: StepStatus) -> usize {
    self.statuses.iter().filter(|(_, s)| *s == status).count()
  }
}
