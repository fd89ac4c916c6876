//! Easyca Publish
//!
//! Filesystem side effects around a workflow run:
//!
//! - [`materialize_tree`] creates the instance's directory skeleton with the
//!   requested mode bits and group ownership before any step executes.
//! - [`ArtifactLinker`] runs after a successful workflow and exposes the
//!   generation-specific key store and CRL at stable, generation-independent
//!   paths.
//!
//! Both are idempotent: they check first and mutate only when the target
//! state is missing, so repeated invocations converge instead of erroring.

mod error;
mod linker;
mod tree;

pub use error::PublishError;
pub use linker::{ArtifactLinker, PublishOutcome};
pub use tree::materialize_tree;
