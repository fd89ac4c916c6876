//! External process invocation for a single step.
//!
//! Steps are spawned as their own process group so that a timeout can take
//! the whole child tree down, not just the `sh` wrapper.

use std::process::Stdio;

use command_group::{AsyncCommandGroup, AsyncGroupChild};
use easyca_workflow::StepSpec;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::warn;

use crate::error::ExecutionError;
use crate::report::ExitReason;

/// Lines longer than this are truncated before collection.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Captured outcome of one step process.
pub(crate) struct StepOutcome {
  pub reason: ExitReason,
  pub stdout: String,
  pub stderr: String,
}

/// Run the step's command to completion, enforcing its timeout.
pub(crate) async fn run_step(spec: &StepSpec) -> Result<StepOutcome, ExecutionError> {
  let mut cmd = Command::new("sh");
  cmd
    .arg("-c")
    .arg(&spec.command)
    .current_dir(&spec.workdir)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  // Overrides layer on top of the ambient environment; the underlying
  // tooling reads the rest of its configuration from `vars`.
  for (key, value) in &spec.env {
    cmd.env(key, value);
  }

  let mut child: AsyncGroupChild = cmd.group_spawn().map_err(|source| ExecutionError::Spawn {
    step: spec.name.clone(),
    source,
  })?;

  let stdout = child
    .inner()
    .stdout
    .take()
    .ok_or_else(|| ExecutionError::Spawn {
      step: spec.name.clone(),
      source: std::io::Error::other("stdout pipe not available"),
    })?;
  let stderr = child
    .inner()
    .stderr
    .take()
    .ok_or_else(|| ExecutionError::Spawn {
      step: spec.name.clone(),
      source: std::io::Error::other("stderr pipe not available"),
    })?;

  let stdout_handle = tokio::spawn(collect_lines(stdout));
  let stderr_handle = tokio::spawn(collect_lines(stderr));

  enum WaitOutcome {
    Completed(std::io::Result<std::process::ExitStatus>),
    TimedOut,
  }

  let reason = match spec.timeout {
    Some(timeout) => {
      let outcome = tokio::select! {
        wait = child.wait() => WaitOutcome::Completed(wait),
        _ = tokio::time::sleep(timeout) => WaitOutcome::TimedOut,
      };
      match outcome {
        WaitOutcome::Completed(wait) => exit_reason(wait),
        WaitOutcome::TimedOut => {
          // Kill the whole process group, then reap.
          if let Err(e) = child.kill().await {
            warn!(step = %spec.name, error = %e, "failed to kill timed out step");
          }
          let _ = child.wait().await;
          ExitReason::Timeout
        }
      }
    }
    None => exit_reason(child.wait().await),
  };

  let stdout = stdout_handle.await.unwrap_or_default();
  let stderr = stderr_handle.await.unwrap_or_default();

  Ok(StepOutcome {
    reason,
    stdout,
    stderr,
  })
}

fn exit_reason(wait: std::io::Result<std::process::ExitStatus>) -> ExitReason {
  match wait {
    Ok(status) => match status.code() {
      Some(code) => ExitReason::Code(code),
      None => ExitReason::Signal,
    },
    Err(e) => {
      warn!(error = %e, "process wait failed");
      ExitReason::Signal
    }
  }
}

async fn collect_lines(pipe: impl tokio::io::AsyncRead + Unpin) -> String {
  let mut reader = BufReader::new(pipe);
  let mut line = String::new();
  let mut collected = String::new();

  loop {
    line.clear();
    match reader.read_line(&mut line).await {
      Ok(0) => break,
      Ok(_) => {
        if line.len() > MAX_LINE_LENGTH {
          // Back up to a char boundary; a multibyte character can straddle
          // the limit.
          let mut cut = MAX_LINE_LENGTH;
          while !line.is_char_boundary(cut) {
            cut -= 1;
          }
          line.truncate(cut);
          line.push_str("... [truncated]\n");
        }
        collected.push_str(&line);
      }
      Err(e) => {
        warn!(error = %e, "error reading process output");
        break;
      }
    }
  }
  collected
}
