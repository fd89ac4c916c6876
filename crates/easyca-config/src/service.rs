//! Service-wide configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Settings shared by every provisioned instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
  /// Root under which each instance gets its own directory.
  #[serde(default = "default_base_dir")]
  pub base_dir: PathBuf,

  /// Numeric gid that should own the instance tree, if any.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub group: Option<u32>,

  /// Link the generation-appropriate openssl config into the working dir.
  #[serde(default = "default_true")]
  pub link_openssl_config: bool,

  /// Version string of the installed easy-rsa tooling.
  #[serde(default = "default_easyrsa_version")]
  pub easyrsa_version: String,

  /// Timeout for quick steps (links, CRL, pre-shared key), in seconds.
  #[serde(default = "default_step_timeout_secs")]
  pub step_timeout_secs: u64,

  /// Timeout for key and DH parameter generation, in seconds.
  ///
  /// DH generation in particular can run for tens of minutes.
  #[serde(default = "default_keygen_timeout_secs")]
  pub keygen_timeout_secs: u64,
}

fn default_base_dir() -> PathBuf {
  PathBuf::from("/etc/openvpn")
}

fn default_true() -> bool {
  true
}

fn default_easyrsa_version() -> String {
  "3.0.8".to_string()
}

fn default_step_timeout_secs() -> u64 {
  300
}

fn default_keygen_timeout_secs() -> u64 {
  2400
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      base_dir: default_base_dir(),
      group: None,
      link_openssl_config: default_true(),
      easyrsa_version: default_easyrsa_version(),
      step_timeout_secs: default_step_timeout_secs(),
      keygen_timeout_secs: default_keygen_timeout_secs(),
    }
  }
}

impl ServiceConfig {
  /// Load the configuration from a JSON file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Root directory for one instance.
  pub fn instance_dir(&self, instance: &str) -> PathBuf {
    self.base_dir.join(instance)
  }

  /// Working directory for all step invocations of one instance.
  pub fn easy_rsa_dir(&self, instance: &str) -> PathBuf {
    self.instance_dir(instance).join("easy-rsa")
  }
}
