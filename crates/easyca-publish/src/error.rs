use std::path::PathBuf;

use thiserror::Error;

/// Errors from directory materialization or artifact publication.
///
/// Reported distinctly from step failures: when the linker fails the
/// cryptographic material already exists and is valid, only its stable
/// exposure went wrong.
#[derive(Debug, Error)]
pub enum PublishError {
  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The alias path exists but is not a symlink we can converge.
  #[error("{path} exists and is not a symlink; refusing to replace it")]
  AliasConflict { path: PathBuf },

  /// The artifact to publish was never produced.
  #[error("missing artifact {path}")]
  MissingArtifact { path: PathBuf },
}

impl PublishError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}
