//! Per-generation workflow construction.
//!
//! The topology is fixed per generation and parameterized by the request:
//! `init-pki-and-ca` → `server-certificate` → `certificate-revocation-list`,
//! with `diffie-hellman-params` included for RSA and the optional
//! `static-preshared-key` hanging off the server certificate. The two
//! generations deliberately disagree on where DH parameter generation sits:
//! Legacy runs it before CA initialization, Modern after the server
//! certificate. That asymmetry mirrors the tooling's own conventions and is
//! preserved, not unified.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use easyca_config::{DnMode, KeyAlgorithm, ProvisioningRequest, ServiceConfig};
use easyca_policy::{ProtocolGeneration, ResolvedTooling};

use crate::error::WorkflowError;
use crate::graph::TaskGraph;
use crate::step::{
  CompletionCheck, StepSpec, CERTIFICATE_REVOCATION_LIST, DIFFIE_HELLMAN_PARAMS, INIT_PKI_AND_CA,
  OPENSSL_CONFIG_LINK, SERVER_CERTIFICATE, STATIC_PRESHARED_KEY,
};

/// Builds the task graph for one provisioning request.
pub struct WorkflowBuilder<'a> {
  request: &'a ProvisioningRequest,
  tooling: &'a ResolvedTooling,
  config: &'a ServiceConfig,
}

impl<'a> WorkflowBuilder<'a> {
  pub fn new(
    request: &'a ProvisioningRequest,
    tooling: &'a ResolvedTooling,
    config: &'a ServiceConfig,
  ) -> Self {
    Self {
      request,
      tooling,
      config,
    }
  }

  /// Emit the task graph for the resolved generation.
  pub fn build(&self) -> Result<TaskGraph, WorkflowError> {
    let steps = match self.tooling.generation {
      ProtocolGeneration::Legacy => self.legacy_steps(),
      ProtocolGeneration::Modern => self.modern_steps(),
    };
    TaskGraph::new(self.request.name.clone(), steps)
  }

  fn workdir(&self) -> PathBuf {
    self.config.easy_rsa_dir(&self.request.name)
  }

  fn short_timeout(&self) -> Duration {
    Duration::from_secs(self.config.step_timeout_secs)
  }

  /// Key and DH parameter generation can run for tens of minutes.
  fn keygen_timeout(&self) -> Duration {
    Duration::from_secs(self.config.keygen_timeout_secs)
  }

  fn step(
    &self,
    name: &str,
    command: String,
    marker: PathBuf,
    requires: &[&str],
    timeout: Duration,
  ) -> StepSpec {
    StepSpec {
      name: name.to_string(),
      command,
      workdir: self.workdir(),
      completion: CompletionCheck::FileExists(marker),
      requires: requires.iter().map(|r| r.to_string()).collect(),
      env: HashMap::new(),
      timeout: Some(timeout),
    }
  }

  /// easy-rsa 2.x: sourced `vars` file, `pkitool`, `keys/` store.
  fn legacy_steps(&self) -> Vec<StepSpec> {
    let dir = self.workdir();
    let cn = &self.request.common_name;
    // Legacy is RSA-only (enforced by the version policy), so a key size
    // is always present here; the DH parameter file embeds it.
    let key_size = self.request.key_size.unwrap_or(2048);

    let mut steps = Vec::new();
    let mut ca_requires: Vec<&str> = Vec::new();

    if self.config.link_openssl_config {
      steps.push(self.step(
        OPENSSL_CONFIG_LINK,
        format!("ln -sf {} openssl.cnf", self.tooling.openssl_config_target()),
        dir.join("openssl.cnf"),
        &[],
        self.short_timeout(),
      ));
      ca_requires.push(OPENSSL_CONFIG_LINK);
    }

    // Declared ahead of CA initialization; the 2.x convention runs DH
    // parameter generation first, off the freshly cleaned key store.
    steps.push(self.step(
      DIFFIE_HELLMAN_PARAMS,
      ". ./vars && ./clean-all && ./build-dh".to_string(),
      dir.join(format!("keys/dh{key_size}.pem")),
      &[],
      self.keygen_timeout(),
    ));

    steps.push(self.step(
      INIT_PKI_AND_CA,
      ". ./vars && ./pkitool --initca".to_string(),
      dir.join("keys/ca.crt"),
      &ca_requires,
      self.keygen_timeout(),
    ));

    steps.push(self.step(
      SERVER_CERTIFICATE,
      format!(". ./vars && ./pkitool --server {cn}"),
      dir.join(format!("keys/{cn}.key")),
      &[INIT_PKI_AND_CA],
      self.keygen_timeout(),
    ));

    // Blank the subject env so a stale common name from `vars` cannot leak
    // into the CRL issuer.
    let mut crl = self.step(
      CERTIFICATE_REVOCATION_LIST,
      ". ./vars && openssl ca -gen-crl -out keys/crl.pem -config \"$KEY_CONFIG\"".to_string(),
      dir.join("keys/crl.pem"),
      &[SERVER_CERTIFICATE],
      self.short_timeout(),
    );
    for var in ["KEY_CN", "KEY_OU", "KEY_NAME", "KEY_ALTNAMES"] {
      crl.env.insert(var.to_string(), String::new());
    }
    steps.push(crl);

    if self.request.tls_static_key {
      steps.push(self.step(
        STATIC_PRESHARED_KEY,
        "openvpn --genkey --secret keys/ta.key".to_string(),
        dir.join("keys/ta.key"),
        &[SERVER_CERTIFICATE],
        self.short_timeout(),
      ));
    }

    steps
  }

  /// easy-rsa 3.x: `easyrsa` subcommands, `pki/` store, batch mode.
  fn modern_steps(&self) -> Vec<StepSpec> {
    let dir = self.workdir();
    let instance_dir = self.config.instance_dir(&self.request.name);
    let cn = &self.request.common_name;

    let mut steps = Vec::new();
    let mut ca_requires: Vec<&str> = Vec::new();

    if self.config.link_openssl_config {
      steps.push(self.step(
        OPENSSL_CONFIG_LINK,
        format!("ln -sf {} openssl.cnf", self.tooling.openssl_config_target()),
        dir.join("openssl.cnf"),
        &[],
        self.short_timeout(),
      ));
      ca_requires.push(OPENSSL_CONFIG_LINK);
    }

    let mut init = self.step(
      INIT_PKI_AND_CA,
      "./easyrsa init-pki && ./easyrsa --batch build-ca nopass".to_string(),
      dir.join("pki/ca.crt"),
      &ca_requires,
      self.keygen_timeout(),
    );
    init.env.insert("EASYRSA_BATCH".to_string(), "1".to_string());
    if self.request.dn_mode == DnMode::CnOnly {
      // cn_only mode carries no subject fields; the CA name comes in
      // through the environment instead.
      init.env.insert(
        "EASYRSA_REQ_CN".to_string(),
        format!("{} CA", self.request.common_name),
      );
    }
    steps.push(init);

    let mut server = self.step(
      SERVER_CERTIFICATE,
      format!("./easyrsa --batch build-server-full {cn} nopass"),
      dir.join(format!("pki/private/{cn}.key")),
      &[INIT_PKI_AND_CA],
      self.keygen_timeout(),
    );
    server.env.insert("EASYRSA_BATCH".to_string(), "1".to_string());
    steps.push(server);

    // The 3.x convention generates DH parameters late, once the
    // certificate chain exists. The file name is fixed, not
    // size-qualified.
    if self.request.key_algorithm == KeyAlgorithm::Rsa {
      steps.push(self.step(
        DIFFIE_HELLMAN_PARAMS,
        "./easyrsa gen-dh".to_string(),
        dir.join("pki/dh.pem"),
        &[SERVER_CERTIFICATE],
        self.keygen_timeout(),
      ));
    }

    // gen-crl reads its issuer from the PKI store, so no subject blanking
    // is needed here; the copy republishes the CRL at the instance root.
    let mut crl = self.step(
      CERTIFICATE_REVOCATION_LIST,
      "./easyrsa gen-crl && cp pki/crl.pem ../crl.pem".to_string(),
      instance_dir.join("crl.pem"),
      &[SERVER_CERTIFICATE],
      self.short_timeout(),
    );
    crl.env.insert("EASYRSA_BATCH".to_string(), "1".to_string());
    steps.push(crl);

    if self.request.tls_static_key {
      steps.push(self.step(
        STATIC_PRESHARED_KEY,
        "openvpn --genkey --secret pki/ta.key".to_string(),
        dir.join("pki/ta.key"),
        &[SERVER_CERTIFICATE],
        self.short_timeout(),
      ));
    }

    steps
  }
}
