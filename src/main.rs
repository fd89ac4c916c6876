use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use easyca_config::{ProvisioningRequest, ServiceConfig};
use easyca_executor::{Executor, StepStatus};
use easyca_publish::{materialize_tree, ArtifactLinker};
use easyca_workflow::WorkflowBuilder;

/// easyca - provision certificate authorities through easy-rsa
#[derive(Parser)]
#[command(name = "easyca")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the service configuration file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the step plan for a request without running anything
  Plan {
    /// Path to the provisioning request file (JSON)
    request_file: PathBuf,
  },

  /// Provision a certificate authority
  Provision {
    /// Path to the provisioning request file (JSON)
    request_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_target(false)
    .compact()
    .init();

  let cli = Cli::parse();

  let config = match &cli.config {
    Some(path) => ServiceConfig::load(path)
      .with_context(|| format!("failed to load service config {}", path.display()))?,
    None => ServiceConfig::default(),
  };

  match cli.command {
    Commands::Plan { request_file } => plan(request_file, config),
    Commands::Provision { request_file } => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(provision(request_file, config))
    }
  }
}

fn load_request(path: &PathBuf) -> Result<ProvisioningRequest> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read request file {}", path.display()))?;
  let request: ProvisioningRequest = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse request file {}", path.display()))?;
  request.validate().context("invalid provisioning request")?;
  Ok(request)
}

fn plan(request_file: PathBuf, config: ServiceConfig) -> Result<()> {
  let request = load_request(&request_file)?;
  let tooling =
    easyca_policy::resolve(&config.easyrsa_version).context("unsupported easy-rsa version")?;
  tooling
    .check_algorithm(request.key_algorithm)
    .context("request incompatible with installed easy-rsa")?;
  let graph = WorkflowBuilder::new(&request, &tooling, &config)
    .build()
    .context("failed to build task graph")?;

  println!("instance: {}", graph.instance());
  for spec in graph.topo_order() {
    println!("  {}", spec.name);
    println!("    command: {}", spec.command);
    println!("    marker:  {}", spec.completion.marker().display());
    if !spec.requires.is_empty() {
      println!("    after:   {}", spec.requires.join(", "));
    }
  }

  Ok(())
}

async fn provision(request_file: PathBuf, config: ServiceConfig) -> Result<()> {
  let request = load_request(&request_file)?;
  let tooling =
    easyca_policy::resolve(&config.easyrsa_version).context("unsupported easy-rsa version")?;
  tooling
    .check_algorithm(request.key_algorithm)
    .context("request incompatible with installed easy-rsa")?;

  let instance_dir = config.instance_dir(&request.name);
  materialize_tree(&instance_dir, tooling.generation, config.group)
    .await
    .context("failed to materialize instance directories")?;

  // The vars file is a precondition of every dependent step; write it
  // before the workflow starts.
  let vars =
    easyca_vars::render_vars(&request, &tooling, &config).context("failed to render vars file")?;
  let vars_path = config.easy_rsa_dir(&request.name).join("vars");
  tokio::fs::write(&vars_path, vars)
    .await
    .with_context(|| format!("failed to write {}", vars_path.display()))?;

  let graph = WorkflowBuilder::new(&request, &tooling, &config)
    .build()
    .context("failed to build task graph")?;

  let cancel = CancellationToken::new();
  let signal_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      signal_cancel.cancel();
    }
  });

  let report = Executor::new()
    .run(&graph, cancel)
    .await
    .context("workflow execution failed")?;

  for (step, status) in &report.statuses {
    eprintln!("{step}: {status:?}");
  }

  if let Some(failure) = &report.failure {
    bail!(
      "step '{}' failed ({}) running `{}`\n{}",
      failure.step,
      failure.reason,
      failure.command,
      failure.stderr
    );
  }

  let outcome = ArtifactLinker::new(&instance_dir, tooling.generation)
    .publish()
    .await
    .context("failed to publish artifacts")?;

  eprintln!(
    "provisioned '{}': {} succeeded, {} skipped{}",
    graph.instance(),
    report.count(StepStatus::Succeeded),
    report.count(StepStatus::Skipped),
    if outcome.changed() {
      ", artifacts published"
    } else {
      ""
    }
  );

  Ok(())
}
