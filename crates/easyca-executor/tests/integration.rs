//! Executor behavior against real processes in a temp directory.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use easyca_executor::{ExecutionError, Executor, ExitReason, StepStatus};
use easyca_workflow::{CompletionCheck, StepSpec, TaskGraph};
use tokio_util::sync::CancellationToken;

fn step(dir: &Path, name: &str, command: &str, marker: &str, requires: &[&str]) -> StepSpec {
  StepSpec {
    name: name.to_string(),
    command: command.to_string(),
    workdir: dir.to_path_buf(),
    completion: CompletionCheck::FileExists(dir.join(marker)),
    requires: requires.iter().map(|r| r.to_string()).collect(),
    env: HashMap::new(),
    timeout: Some(Duration::from_secs(10)),
  }
}

#[tokio::test]
async fn successful_run_then_full_skip_on_rerun() {
  let tmp = tempfile::tempdir().unwrap();
  let dir = tmp.path();

  let graph = TaskGraph::new(
    "test",
    vec![
      step(dir, "ca", "touch ca.crt", "ca.crt", &[]),
      step(dir, "server", "touch server.key", "server.key", &["ca"]),
      step(dir, "crl", "touch crl.pem", "crl.pem", &["server"]),
    ],
  )
  .unwrap();

  let executor = Executor::new();

  let first = executor.run(&graph, CancellationToken::new()).await.unwrap();
  assert!(first.is_success());
  assert_eq!(first.count(StepStatus::Succeeded), 3);

  // Every marker now exists; the rerun must not invoke anything.
  let second = executor.run(&graph, CancellationToken::new()).await.unwrap();
  assert!(second.is_success());
  assert_eq!(second.count(StepStatus::Skipped), 3);
  assert_eq!(second.count(StepStatus::Succeeded), 0);
}

#[tokio::test]
async fn failure_aborts_dependents_and_everything_after() {
  let tmp = tempfile::tempdir().unwrap();
  let dir = tmp.path();

  let graph = TaskGraph::new(
    "test",
    vec![
      step(dir, "ca", "touch ca.crt", "ca.crt", &[]),
      step(dir, "server", "echo broken >&2; false", "server.key", &["ca"]),
      step(dir, "crl", "touch crl.pem", "crl.pem", &["server"]),
      // Independent of the certificate chain, but fail-fast still stops it.
      step(dir, "dh", "touch dh.pem", "dh.pem", &[]),
    ],
  )
  .unwrap();

  let report = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();

  assert!(!report.is_success());
  assert_eq!(report.status("ca"), Some(StepStatus::Succeeded));
  assert_eq!(report.status("server"), Some(StepStatus::Failed));
  assert_eq!(report.status("crl"), Some(StepStatus::Aborted));
  assert_eq!(report.status("dh"), Some(StepStatus::Aborted));

  let failure = report.failure.unwrap();
  assert_eq!(failure.step, "server");
  assert_eq!(failure.reason, ExitReason::Code(1));
  assert!(failure.stderr.contains("broken"));
  assert!(!dir.join("crl.pem").exists());
}

#[tokio::test]
async fn overlong_multibyte_output_keeps_the_stderr_tail() {
  let tmp = tempfile::tempdir().unwrap();
  let dir = tmp.path();

  // One stderr line well past the truncation limit, with a multibyte
  // character straddling the cut, followed by the actual diagnostic.
  let command =
    r#"{ head -c 65535 /dev/zero | tr '\0' 'x'; printf 'äää\nhandshake failed\n'; } >&2; false"#;
  let graph = TaskGraph::new("test", vec![step(dir, "ca", command, "ca.crt", &[])]).unwrap();

  let report = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(report.status("ca"), Some(StepStatus::Failed));
  let failure = report.failure.unwrap();
  assert!(
    failure.stderr.contains("handshake failed"),
    "diagnostic after the overlong line must survive: {:?}",
    failure.stderr
  );
}

#[tokio::test]
async fn rerun_after_failure_resumes_via_markers() {
  let tmp = tempfile::tempdir().unwrap();
  let dir = tmp.path();

  // First run: "server" fails. Second run: "ca" is skipped (marker from the
  // first run), "server" now succeeds.
  let failing = TaskGraph::new(
    "test",
    vec![
      step(dir, "ca", "touch ca.crt", "ca.crt", &[]),
      step(dir, "server", "false", "server.key", &["ca"]),
    ],
  )
  .unwrap();
  let report = Executor::new()
    .run(&failing, CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(report.status("ca"), Some(StepStatus::Succeeded));

  let fixed = TaskGraph::new(
    "test",
    vec![
      step(dir, "ca", "touch ca.crt", "ca.crt", &[]),
      step(dir, "server", "touch server.key", "server.key", &["ca"]),
    ],
  )
  .unwrap();
  let report = Executor::new()
    .run(&fixed, CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(report.status("ca"), Some(StepStatus::Skipped));
  assert_eq!(report.status("server"), Some(StepStatus::Succeeded));
}

#[tokio::test]
async fn timeout_fails_the_step_and_kills_the_process() {
  let tmp = tempfile::tempdir().unwrap();
  let dir = tmp.path();

  let mut slow = step(dir, "dh", "sleep 30 && touch dh.pem", "dh.pem", &[]);
  slow.timeout = Some(Duration::from_millis(200));

  let graph = TaskGraph::new("test", vec![slow]).unwrap();
  let report = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(report.status("dh"), Some(StepStatus::Failed));
  let failure = report.failure.unwrap();
  assert_eq!(failure.reason, ExitReason::Timeout);
  assert!(!dir.join("dh.pem").exists());
}

#[tokio::test]
async fn environment_overrides_layer_on_the_ambient_environment() {
  let tmp = tempfile::tempdir().unwrap();
  let dir = tmp.path();

  let mut spec = step(dir, "env", "printf '%s' \"$CA_NAME\" > out.txt", "out.txt", &[]);
  spec.env.insert("CA_NAME".to_string(), "contractors".to_string());

  let graph = TaskGraph::new("test", vec![spec]).unwrap();
  let report = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();

  assert!(report.is_success());
  let content = std::fs::read_to_string(dir.join("out.txt")).unwrap();
  assert_eq!(content, "contractors");
}

#[tokio::test]
async fn cancelled_token_stops_before_any_step() {
  let tmp = tempfile::tempdir().unwrap();
  let dir = tmp.path();

  let graph = TaskGraph::new("test", vec![step(dir, "ca", "touch ca.crt", "ca.crt", &[])]).unwrap();

  let cancel = CancellationToken::new();
  cancel.cancel();

  let result = Executor::new().run(&graph, cancel).await;
  assert!(matches!(result, Err(ExecutionError::Cancelled)));
  assert!(!dir.join("ca.crt").exists());
}
