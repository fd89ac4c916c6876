//! Easyca Workflow
//!
//! The provisioning task graph: a small, statically known DAG of idempotent
//! external-process steps, built fresh per request and never persisted. The
//! only durable state a run leaves behind is the files the steps create,
//! which double as completion markers for the next run.
//!
//! - [`StepSpec`] describes one step: command, working directory, completion
//!   check, prerequisites, environment overrides, timeout.
//! - [`TaskGraph`] holds the steps in declaration order, validates the edge
//!   set (no unknown prerequisites, no cycles) and yields a deterministic
//!   topological order.
//! - [`WorkflowBuilder`] emits the per-generation topology for one request.

mod builder;
mod error;
mod graph;
mod step;

pub use builder::WorkflowBuilder;
pub use error::WorkflowError;
pub use graph::TaskGraph;
pub use step::{
  CompletionCheck, StepSpec, CERTIFICATE_REVOCATION_LIST, DIFFIE_HELLMAN_PARAMS, INIT_PKI_AND_CA,
  OPENSSL_CONFIG_LINK, SERVER_CERTIFICATE, STATIC_PRESHARED_KEY,
};
