//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are detected before any provisioning step runs.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// Instance name is empty or would not form a safe path segment.
  #[error("invalid instance name '{0}': must be a single non-empty path segment")]
  InvalidInstanceName(String),

  /// RSA requests must carry an explicit key size.
  #[error("key algorithm 'rsa' requires a key size")]
  MissingKeySize,

  /// Key size only parameterizes RSA key generation.
  #[error("key size is not applicable to key algorithm '{algorithm}'")]
  KeySizeNotApplicable { algorithm: String },

  /// Curve-based algorithms must name their curve.
  #[error("key algorithm '{algorithm}' requires a named curve")]
  MissingCurve { algorithm: String },

  /// A named curve only parameterizes elliptic/Ed key generation.
  #[error("a named curve is not applicable to key algorithm 'rsa'")]
  CurveNotApplicable,

  /// A validity period of zero days is always a mistake.
  #[error("{field} must be at least 1 day")]
  InvalidValidityPeriod { field: &'static str },

  /// Failed to read a configuration file.
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Failed to parse a configuration file.
  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}
