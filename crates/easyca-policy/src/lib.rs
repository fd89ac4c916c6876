//! Easyca Policy
//!
//! Classifies an easy-rsa version string into one of the two supported
//! protocol generations:
//!
//! - [`ProtocolGeneration::Legacy`] for 2.x (`pkitool` command set)
//! - [`ProtocolGeneration::Modern`] for 3.x (`easyrsa` command set)
//!
//! Anything below 2.0 or at 4.0 and above is a resolution failure.
//! Resolution is a pure function of the version string; it happens once per
//! provisioning request and is never cached or retried.
//!
//! The comparison is numeric, not lexical, via the `semver` crate. Short
//! version strings ("3", "2.0") are padded with zero components before
//! parsing, since packaged easy-rsa versions are not always full triples.

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use easyca_config::KeyAlgorithm;

/// The two mutually exclusive command conventions of easy-rsa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolGeneration {
  /// easy-rsa 2.x: sourced `vars`, `pkitool`, size-qualified DH file.
  Legacy,
  /// easy-rsa 3.x: `easyrsa` subcommands, `pki/` store, fixed DH file.
  Modern,
}

/// Errors raised by version resolution and its constraint checks.
#[derive(Debug, Error)]
pub enum PolicyError {
  #[error("unparseable easy-rsa version '{0}'")]
  Unparseable(String),

  #[error("easy-rsa {0} is unsupported, too old (minimum 2.0)")]
  TooOld(Version),

  #[error("easy-rsa {0} is unsupported, too new (maximum 3.x)")]
  TooNew(Version),

  #[error("key algorithm '{algorithm}' is not supported by easy-rsa 2.x (rsa only)")]
  LegacyAlgorithm { algorithm: String },
}

/// A resolved generation together with the exact version that produced it.
///
/// The version is kept because Modern behavior varies with the patch level
/// (openssl config naming changed within the 3.0 line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTooling {
  pub generation: ProtocolGeneration,
  pub version: Version,
}

/// Resolve a tool-version string into a protocol generation.
///
/// `[2.0, 3.0)` is Legacy, `[3.0, 4.0)` is Modern, everything else errors.
pub fn resolve(version: &str) -> Result<ResolvedTooling, PolicyError> {
  let parsed = parse_lenient(version)?;
  let generation = match parsed.major {
    0 | 1 => return Err(PolicyError::TooOld(parsed)),
    2 => ProtocolGeneration::Legacy,
    3 => ProtocolGeneration::Modern,
    _ => return Err(PolicyError::TooNew(parsed)),
  };
  Ok(ResolvedTooling {
    generation,
    version: parsed,
  })
}

/// Parse a version string, padding missing minor/patch components with zero.
fn parse_lenient(version: &str) -> Result<Version, PolicyError> {
  let trimmed = version.trim();
  let padded = match trimmed.split('.').count() {
    1 => format!("{trimmed}.0.0"),
    2 => format!("{trimmed}.0"),
    _ => trimmed.to_string(),
  };
  Version::parse(&padded).map_err(|_| PolicyError::Unparseable(version.to_string()))
}

impl ResolvedTooling {
  /// Reject algorithm/generation combinations the tooling cannot express.
  ///
  /// easy-rsa 2.x only generates RSA keys.
  pub fn check_algorithm(&self, algorithm: KeyAlgorithm) -> Result<(), PolicyError> {
    if self.generation == ProtocolGeneration::Legacy && algorithm != KeyAlgorithm::Rsa {
      return Err(PolicyError::LegacyAlgorithm {
        algorithm: algorithm.to_string(),
      });
    }
    Ok(())
  }

  /// Name of the default openssl config file shipped by this version.
  ///
  /// The 3.0 line renamed its default config in 3.0.3.
  pub fn openssl_config_target(&self) -> &'static str {
    match self.generation {
      ProtocolGeneration::Legacy => "openssl-1.0.0.cnf",
      ProtocolGeneration::Modern => {
        if self.version < Version::new(3, 0, 3) {
          "openssl-1.0.cnf"
        } else {
          "openssl-easyrsa.cnf"
        }
      }
    }
  }
}
