//! Step descriptions and completion checks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Step name: link the version-appropriate openssl config into place.
pub const OPENSSL_CONFIG_LINK: &str = "openssl-config-link";
/// Step name: initialize the PKI store and build the CA key pair.
pub const INIT_PKI_AND_CA: &str = "init-pki-and-ca";
/// Step name: issue the server certificate and private key.
pub const SERVER_CERTIFICATE: &str = "server-certificate";
/// Step name: generate Diffie-Hellman parameters (RSA only).
pub const DIFFIE_HELLMAN_PARAMS: &str = "diffie-hellman-params";
/// Step name: generate and publish the certificate revocation list.
pub const CERTIFICATE_REVOCATION_LIST: &str = "certificate-revocation-list";
/// Step name: generate the optional static pre-shared key.
pub const STATIC_PRESHARED_KEY: &str = "static-preshared-key";

/// Predicate deciding whether a step's work product already exists.
///
/// The default (and currently only) form is marker-file existence. Richer
/// predicates (checksum match, certificate expiry) can be added as variants
/// without touching the executor's control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompletionCheck {
  /// The step is complete when this path exists.
  FileExists(PathBuf),
}

impl CompletionCheck {
  /// Evaluate the predicate against the current filesystem state.
  pub fn is_satisfied(&self) -> bool {
    match self {
      CompletionCheck::FileExists(path) => path.exists(),
    }
  }

  /// The marker path, for reporting.
  pub fn marker(&self) -> &PathBuf {
    match self {
      CompletionCheck::FileExists(path) => path,
    }
  }
}

/// Immutable description of one provisioning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
  /// Step name, unique within its graph.
  pub name: String,
  /// Shell command, run via `sh -c`.
  pub command: String,
  /// Working directory for the command.
  pub workdir: PathBuf,
  /// Idempotence guard; a satisfied check skips the step.
  pub completion: CompletionCheck,
  /// Names of steps that must have completed before this one runs.
  #[serde(default)]
  pub requires: Vec<String>,
  /// Environment overrides, layered on top of the ambient environment.
  #[serde(default)]
  pub env: HashMap<String, String>,
  /// Kill the process tree and fail the step when this elapses.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout: Option<Duration>,
}
