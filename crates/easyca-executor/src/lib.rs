//! Easyca Executor
//!
//! Walks a provisioning task graph in topological order, strictly
//! sequentially:
//!
//! - a step whose completion marker already exists is skipped,
//! - everything else runs as an external process (`sh -c`) in the step's
//!   working directory, with env overrides layered on the ambient
//!   environment and a per-step timeout,
//! - on the first failure the remaining graph is aborted, including
//!   independent branches, because later steps assume a fully formed CA
//!   hierarchy.
//!
//! The executor writes nothing itself; all side effects belong to the
//! commands it runs. Re-invoking a half-finished workflow resumes through
//! the markers the successful steps left behind.

mod error;
mod executor;
mod process;
mod report;

pub use error::ExecutionError;
pub use executor::Executor;
pub use report::{ExecutionReport, ExitReason, FailureDetail, StepStatus};
