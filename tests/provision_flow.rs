//! End-to-end provisioning flow against a stubbed easy-rsa 3.x.
//!
//! A fake `easyrsa` script in the instance's working directory stands in for
//! the real tooling; everything else (policy, builder, executor, linker)
//! runs for real against a temp base directory.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use easyca_config::{KeyAlgorithm, ProvisioningRequest, ServiceConfig, SubjectOverrides};
use easyca_executor::{Executor, StepStatus};
use easyca_publish::{materialize_tree, ArtifactLinker};
use easyca_workflow::WorkflowBuilder;
use tokio_util::sync::CancellationToken;

const FAKE_EASYRSA: &str = r#"#!/bin/sh
cmd=""
args=""
for arg in "$@"; do
  case "$arg" in
    --batch|nopass) ;;
    *) if [ -z "$cmd" ]; then cmd="$arg"; else args="$args $arg"; fi ;;
  esac
done
case "$cmd" in
  init-pki) mkdir -p pki/private ;;
  build-ca) echo ca > pki/ca.crt ;;
  build-server-full) name=$(echo $args); echo key > "pki/private/$name.key" ;;
  gen-dh) echo dh > pki/dh.pem ;;
  gen-crl) echo crl > pki/crl.pem ;;
  *) echo "unknown command: $cmd" >&2; exit 1 ;;
esac
"#;

fn request() -> ProvisioningRequest {
  ProvisioningRequest {
    name: "contractors".to_string(),
    country: "DE".to_string(),
    province: "BE".to_string(),
    city: "Berlin".to_string(),
    organization: "Example Org".to_string(),
    email: "ops@example.org".to_string(),
    common_name: "server".to_string(),
    dn_mode: Default::default(),
    key_algorithm: KeyAlgorithm::Rsa,
    key_size: Some(2048),
    curve: None,
    ca_expire_days: 3650,
    cert_expire_days: 3650,
    crl_days: 30,
    digest: "sha512".to_string(),
    subject_overrides: SubjectOverrides::default(),
    tls_static_key: false,
  }
}

fn install_fake_easyrsa(easy_rsa_dir: &Path) {
  let script = easy_rsa_dir.join("easyrsa");
  std::fs::write(&script, FAKE_EASYRSA).unwrap();
  std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn modern_rsa_provisioning_end_to_end() {
  let tmp = tempfile::tempdir().unwrap();
  let config = ServiceConfig {
    base_dir: tmp.path().to_path_buf(),
    link_openssl_config: false,
    easyrsa_version: "3.0.8".to_string(),
    ..ServiceConfig::default()
  };

  let request = request();
  request.validate().unwrap();
  let tooling = easyca_policy::resolve(&config.easyrsa_version).unwrap();
  tooling.check_algorithm(request.key_algorithm).unwrap();

  let instance_dir = config.instance_dir(&request.name);
  materialize_tree(&instance_dir, tooling.generation, None).await.unwrap();

  let vars = easyca_vars::render_vars(&request, &tooling, &config).unwrap();
  std::fs::write(config.easy_rsa_dir(&request.name).join("vars"), vars).unwrap();
  install_fake_easyrsa(&config.easy_rsa_dir(&request.name));

  let graph = WorkflowBuilder::new(&request, &tooling, &config).build().unwrap();

  // First run: everything executes.
  let report = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();
  assert!(report.is_success(), "failure: {:?}", report.failure);
  assert_eq!(report.count(StepStatus::Succeeded), 4);
  assert!(instance_dir.join("easy-rsa/pki/ca.crt").exists());
  assert!(instance_dir.join("easy-rsa/pki/private/server.key").exists());
  assert!(instance_dir.join("easy-rsa/pki/dh.pem").exists());
  assert!(instance_dir.join("crl.pem").exists());

  // Second run: every marker exists, nothing is invoked.
  let rerun = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(rerun.count(StepStatus::Skipped), 4);
  assert_eq!(rerun.count(StepStatus::Succeeded), 0);

  // Publish exposes the stable paths; a second publish converges silently.
  let linker = ArtifactLinker::new(&instance_dir, tooling.generation);
  let outcome = linker.publish().await.unwrap();
  assert!(outcome.alias_created);
  assert!(!outcome.crl_copied, "the CRL step already republished it");
  assert!(!linker.publish().await.unwrap().changed());

  let alias = std::fs::read_link(instance_dir.join("keys")).unwrap();
  assert_eq!(alias, std::path::PathBuf::from("easy-rsa/pki"));
}

#[tokio::test]
async fn failed_server_certificate_aborts_the_chain_and_resumes() {
  let tmp = tempfile::tempdir().unwrap();
  let config = ServiceConfig {
    base_dir: tmp.path().to_path_buf(),
    link_openssl_config: false,
    easyrsa_version: "3.0.8".to_string(),
    ..ServiceConfig::default()
  };

  let request = request();
  let tooling = easyca_policy::resolve(&config.easyrsa_version).unwrap();
  let instance_dir = config.instance_dir(&request.name);
  materialize_tree(&instance_dir, tooling.generation, None).await.unwrap();

  // A stub that can init a CA but fails everything else.
  let easy_rsa_dir = config.easy_rsa_dir(&request.name);
  let script = easy_rsa_dir.join("easyrsa");
  std::fs::write(
    &script,
    "#!/bin/sh\ncase \"$*\" in\n  *init-pki*) mkdir -p pki/private ;;\n  *build-ca*) echo ca > pki/ca.crt ;;\n  *) echo nope >&2; exit 1 ;;\nesac\n",
  )
  .unwrap();
  std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

  let graph = WorkflowBuilder::new(&request, &tooling, &config).build().unwrap();
  let report = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(report.status("init-pki-and-ca"), Some(StepStatus::Succeeded));
  assert_eq!(report.status("server-certificate"), Some(StepStatus::Failed));
  assert_eq!(
    report.status("certificate-revocation-list"),
    Some(StepStatus::Aborted)
  );
  assert_eq!(report.status("diffie-hellman-params"), Some(StepStatus::Aborted));

  // Fix the tooling and rerun: the CA init is skipped, the rest completes.
  install_fake_easyrsa(&easy_rsa_dir);
  let report = Executor::new()
    .run(&graph, CancellationToken::new())
    .await
    .unwrap();
  assert!(report.is_success());
  assert_eq!(report.status("init-pki-and-ca"), Some(StepStatus::Skipped));
  assert_eq!(
    report.status("server-certificate"),
    Some(StepStatus::Succeeded)
  );
}
