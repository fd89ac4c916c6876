//! Sequential workflow executor.

use easyca_workflow::TaskGraph;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::error::ExecutionError;
use crate::process;
use crate::report::{ExecutionReport, FailureDetail, StepStatus};

/// How much captured stderr to keep in the failure detail.
const STDERR_TAIL: usize = 4096;

/// Runs a task graph strictly sequentially.
///
/// Independent branches are deliberately not parallelized: every step of an
/// instance shares one mutable key-store directory, and concurrent tool
/// invocations would race on it.
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
  pub fn new() -> Self {
    Self
  }

  /// Execute the graph and report per-step outcomes.
  ///
  /// Returns `Err` only for engine faults (cancellation, spawn failure);
  /// step failures are reported through the
  /// [`ExecutionReport`](crate::ExecutionReport) so the caller can see
  /// which steps succeeded before the failure and which were aborted.
  #[instrument(name = "workflow_run", skip(self, graph, cancel), fields(instance = %graph.instance()))]
  pub async fn run(
    &self,
    graph: &TaskGraph,
    cancel: CancellationToken,
  ) -> Result<ExecutionReport, ExecutionError> {
    let order = graph.topo_order();
    info!(steps = order.len(), "workflow_started");

    let mut statuses: Vec<(String, StepStatus)> = Vec::with_capacity(order.len());
    let mut failure: Option<FailureDetail> = None;

    for spec in order {
      // Fail fast: once one step fails, nothing else is attempted, not
      // even independent branches. Later steps assume a fully formed CA
      // hierarchy.
      if failure.is_some() {
        statuses.push((spec.name.clone(), StepStatus::Aborted));
        continue;
      }

      if cancel.is_cancelled() {
        info!(step = %spec.name, "workflow_cancelled");
        return Err(ExecutionError::Cancelled);
      }

      if spec.completion.is_satisfied() {
        info!(step = %spec.name, marker = %spec.completion.marker().display(), "step_skipped");
        statuses.push((spec.name.clone(), StepStatus::Skipped));
        continue;
      }

      info!(step = %spec.name, command = %spec.command, "step_started");
      let outcome = process::run_step(spec).await?;

      if outcome.reason.is_success() {
        debug!(step = %spec.name, stdout = %outcome.stdout, "step_output");
        info!(step = %spec.name, "step_succeeded");
        statuses.push((spec.name.clone(), StepStatus::Succeeded));
      } else {
        error!(
          step = %spec.name,
          reason = %outcome.reason,
          stderr = %outcome.stderr,
          "step_failed"
        );
        statuses.push((spec.name.clone(), StepStatus::Failed));
        failure = Some(FailureDetail {
          step: spec.name.clone(),
          command: spec.command.clone(),
          reason: outcome.reason,
          stderr: tail(&outcome.stderr, STDERR_TAIL),
        });
      }
    }

    let report = ExecutionReport {
      instance: graph.instance().to_string(),
      statuses,
      failure,
    };

    match &report.failure {
      None => info!(
        succeeded = report.count(StepStatus::Succeeded),
        skipped = report.count(StepStatus::Skipped),
        "workflow_completed"
      ),
      Some(f) => error!(step = %f.step, reason = %f.reason, "workflow_failed"),
    }

    Ok(report)
  }
}

/// Last `max` bytes of `s`, rounded to a char boundary.
fn tail(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut start = s.len() - max;
  while !s.is_char_boundary(start) {
    start += 1;
  }
  s[start..].to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tail_keeps_short_strings_whole() {
    assert_eq!(tail("hello", 16), "hello");
  }

  #[test]
  fn tail_cuts_on_char_boundaries() {
    let s = "aaaäöü";
    let t = tail(s, 5);
    assert!(t.len() <= 5);
    assert!(s.ends_with(&t));
  }
}
