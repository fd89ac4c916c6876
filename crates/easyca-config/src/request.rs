//! Provisioning request types and validation.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Key algorithm used for the CA and server key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAlgorithm {
  /// RSA; requires `key_size`, enables Diffie-Hellman parameter generation.
  Rsa,
  /// Elliptic curve; requires `curve`.
  Ec,
  /// Ed-family (e.g. ed25519); requires `curve`.
  Ed,
}

impl KeyAlgorithm {
  /// The algorithm name as easy-rsa expects it.
  pub fn as_easyrsa(&self) -> &'static str {
    match self {
      KeyAlgorithm::Rsa => "rsa",
      KeyAlgorithm::Ec => "ec",
      KeyAlgorithm::Ed => "ed",
    }
  }
}

impl std::fmt::Display for KeyAlgorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_easyrsa())
  }
}

/// Distinguished-name mode for the CA certificate subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnMode {
  /// Full organizational subject (country, province, city, org, email).
  #[default]
  Org,
  /// Common-name-only subject.
  CnOnly,
}

impl DnMode {
  /// The mode name as easy-rsa expects it.
  pub fn as_easyrsa(&self) -> &'static str {
    match self {
      DnMode::Org => "org",
      DnMode::CnOnly => "cn_only",
    }
  }
}

/// Optional per-field overrides for the certificate subject.
///
/// An unset field falls back to the corresponding request field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectOverrides {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub province: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub organization: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

/// Input parameters for provisioning one certificate-authority instance.
///
/// Constructed once per invocation and immutable thereafter. Must pass
/// [`validate`](ProvisioningRequest::validate) before any step runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
  /// Unique instance name; becomes the directory name under the base dir.
  pub name: String,

  pub country: String,
  pub province: String,
  pub city: String,
  pub organization: String,
  pub email: String,

  /// Common name of the server certificate.
  #[serde(default = "default_common_name")]
  pub common_name: String,

  #[serde(default)]
  pub dn_mode: DnMode,

  pub key_algorithm: KeyAlgorithm,

  /// Key size in bits; meaningful only for RSA.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub key_size: Option<u32>,

  /// Named curve; meaningful only for elliptic/Ed algorithms.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub curve: Option<String>,

  /// CA certificate validity period in days.
  #[serde(default = "default_expire_days")]
  pub ca_expire_days: u32,

  /// Leaf certificate validity period in days.
  #[serde(default = "default_expire_days")]
  pub cert_expire_days: u32,

  /// CRL validity period in days.
  #[serde(default = "default_crl_days")]
  pub crl_days: u32,

  /// Digest algorithm for signatures.
  #[serde(default = "default_digest")]
  pub digest: String,

  #[serde(default)]
  pub subject_overrides: SubjectOverrides,

  /// Generate a static pre-shared key (`ta.key`) alongside the certificates.
  #[serde(default)]
  pub tls_static_key: bool,
}

fn default_common_name() -> String {
  "server".to_string()
}

fn default_expire_days() -> u32 {
  3650
}

fn default_crl_days() -> u32 {
  30
}

fn default_digest() -> String {
  "sha512".to_string()
}

impl ProvisioningRequest {
  /// Validate field combinations.
  ///
  /// Key size is meaningful only for RSA, a named curve only for Ec/Ed;
  /// violating combinations are rejected here, before any side effect.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.name.is_empty()
      || self.name.contains('/')
      || self.name.contains(char::is_whitespace)
      || self.name == "."
      || self.name == ".."
    {
      return Err(ConfigError::InvalidInstanceName(self.name.clone()));
    }

    match self.key_algorithm {
      KeyAlgorithm::Rsa => {
        if self.curve.is_some() {
          return Err(ConfigError::CurveNotApplicable);
        }
        if self.key_size.is_none() {
          return Err(ConfigError::MissingKeySize);
        }
      }
      KeyAlgorithm::Ec | KeyAlgorithm::Ed => {
        if self.key_size.is_some() {
          return Err(ConfigError::KeySizeNotApplicable {
            algorithm: self.key_algorithm.to_string(),
          });
        }
        if self.curve.is_none() {
          return Err(ConfigError::MissingCurve {
            algorithm: self.key_algorithm.to_string(),
          });
        }
      }
    }

    for (field, days) in [
      ("ca_expire_days", self.ca_expire_days),
      ("cert_expire_days", self.cert_expire_days),
      ("crl_days", self.crl_days),
    ] {
      if days == 0 {
        return Err(ConfigError::InvalidValidityPeriod { field });
      }
    }

    Ok(())
  }

  /// Subject country after overrides.
  pub fn subject_country(&self) -> &str {
    self.subject_overrides.country.as_deref().unwrap_or(&self.country)
  }

  /// Subject province after overrides.
  pub fn subject_province(&self) -> &str {
    self.subject_overrides.province.as_deref().unwrap_or(&self.province)
  }

  /// Subject city after overrides.
  pub fn subject_city(&self) -> &str {
    self.subject_overrides.city.as_deref().unwrap_or(&self.city)
  }

  /// Subject organization after overrides.
  pub fn subject_organization(&self) -> &str {
    self
      .subject_overrides
      .organization
      .as_deref()
      .unwrap_or(&self.organization)
  }

  /// Subject email after overrides.
  pub fn subject_email(&self) -> &str {
    self.subject_overrides.email.as_deref().unwrap_or(&self.email)
  }
}
