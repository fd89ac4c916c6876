//! Easyca Vars
//!
//! Renders the easy-rsa parameter file ("vars") for a provisioning request.
//! Both generations read their settings from this file: easy-rsa 2.x sources
//! it as shell exports, easy-rsa 3.x picks it up as `set_var` directives from
//! the working directory. Rendering must complete before any dependent step
//! runs; the binary writes the result into the instance's easy-rsa dir.

use minijinja::Environment;
use serde::Serialize;
use thiserror::Error;

use easyca_config::{ProvisioningRequest, ServiceConfig};
use easyca_policy::{ProtocolGeneration, ResolvedTooling};

const LEGACY_VARS: &str = include_str!("vars-legacy.j2");
const MODERN_VARS: &str = include_str!("vars-modern.j2");

#[derive(Debug, Error)]
pub enum VarsError {
  #[error("failed to render vars for instance '{instance}': {message}")]
  Render { instance: String, message: String },
}

/// Template context assembled from request, tooling and service config.
///
/// Subject fields go through the request's override accessors, so a
/// per-field subject override lands in the rendered file.
#[derive(Serialize)]
struct VarsContext<'a> {
  instance: &'a str,
  easy_rsa_dir: String,
  algorithm: &'a str,
  key_size: Option<u32>,
  curve: Option<&'a str>,
  dn_mode: &'a str,
  country: &'a str,
  province: &'a str,
  city: &'a str,
  organization: &'a str,
  email: &'a str,
  common_name: &'a str,
  ca_expire_days: u32,
  cert_expire_days: u32,
  crl_days: u32,
  digest: &'a str,
}

/// Render the vars file content for the resolved generation.
pub fn render_vars(
  request: &ProvisioningRequest,
  tooling: &ResolvedTooling,
  config: &ServiceConfig,
) -> Result<String, VarsError> {
  let template = match tooling.generation {
    ProtocolGeneration::Legacy => LEGACY_VARS,
    ProtocolGeneration::Modern => MODERN_VARS,
  };

  let context = VarsContext {
    instance: &request.name,
    easy_rsa_dir: config.easy_rsa_dir(&request.name).display().to_string(),
    algorithm: request.key_algorithm.as_easyrsa(),
    key_size: request.key_size,
    curve: request.curve.as_deref(),
    dn_mode: request.dn_mode.as_easyrsa(),
    country: request.subject_country(),
    province: request.subject_province(),
    city: request.subject_city(),
    organization: request.subject_organization(),
    email: request.subject_email(),
    common_name: &request.common_name,
    ca_expire_days: request.ca_expire_days,
    cert_expire_days: request.cert_expire_days,
    crl_days: request.crl_days,
    digest: &request.digest,
  };

  let env = Environment::new();
  env
    .render_str(template, minijinja::Value::from_serialize(&context))
    .map_err(|e| VarsError::Render {
      instance: request.name.clone(),
      message: e.to_string(),
    })
}
