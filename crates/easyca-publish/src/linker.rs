//! Stable artifact publication after a successful run.

use std::path::{Path, PathBuf};

use easyca_policy::ProtocolGeneration;
use tracing::info;

use crate::error::PublishError;

/// What [`ArtifactLinker::publish`] actually changed.
///
/// A second invocation after a successful publish reports both flags false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishOutcome {
  pub alias_created: bool,
  pub crl_copied: bool,
}

impl PublishOutcome {
  pub fn changed(&self) -> bool {
    self.alias_created || self.crl_copied
  }
}

/// Exposes generated key material at stable, generation-independent paths:
///
/// - `<instance>/keys` — symlink to the generation's key store,
/// - `<instance>/crl.pem` — copy of the generated CRL.
pub struct ArtifactLinker {
  instance_dir: PathBuf,
  generation: ProtocolGeneration,
}

impl ArtifactLinker {
  pub fn new(instance_dir: impl Into<PathBuf>, generation: ProtocolGeneration) -> Self {
    Self {
      instance_dir: instance_dir.into(),
      generation,
    }
  }

  /// Relative symlink target for the `keys` alias.
  fn keystore_target(&self) -> &'static str {
    match self.generation {
      ProtocolGeneration::Legacy => "easy-rsa/keys",
      ProtocolGeneration::Modern => "easy-rsa/pki",
    }
  }

  /// Where the workflow left the CRL.
  fn crl_source(&self) -> PathBuf {
    match self.generation {
      ProtocolGeneration::Legacy => self.instance_dir.join("easy-rsa/keys/crl.pem"),
      ProtocolGeneration::Modern => self.instance_dir.join("easy-rsa/pki/crl.pem"),
    }
  }

  /// Publish the stable paths; no-op where they already converged.
  pub async fn publish(&self) -> Result<PublishOutcome, PublishError> {
    let alias_created = self.ensure_keys_alias().await?;
    let crl_copied = self.ensure_crl().await?;
    Ok(PublishOutcome {
      alias_created,
      crl_copied,
    })
  }

  async fn ensure_keys_alias(&self) -> Result<bool, PublishError> {
    let alias = self.instance_dir.join("keys");
    let target = Path::new(self.keystore_target());

    match tokio::fs::symlink_metadata(&alias).await {
      Ok(meta) if meta.file_type().is_symlink() => {
        let current = tokio::fs::read_link(&alias)
          .await
          .map_err(|e| PublishError::io(&alias, e))?;
        if current == target {
          return Ok(false);
        }
        // Wrong target, converge.
        tokio::fs::remove_file(&alias)
          .await
          .map_err(|e| PublishError::io(&alias, e))?;
      }
      Ok(_) => return Err(PublishError::AliasConflict { path: alias }),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => return Err(PublishError::io(&alias, e)),
    }

    tokio::fs::symlink(target, &alias)
      .await
      .map_err(|e| PublishError::io(&alias, e))?;
    info!(alias = %alias.display(), target = %target.display(), "keys_alias_created");
    Ok(true)
  }

  async fn ensure_crl(&self) -> Result<bool, PublishError> {
    let dest = self.instance_dir.join("crl.pem");
    if tokio::fs::try_exists(&dest)
      .await
      .map_err(|e| PublishError::io(&dest, e))?
    {
      return Ok(false);
    }

    let source = self.crl_source();
    if !tokio::fs::try_exists(&source)
      .await
      .map_err(|e| PublishError::io(&source, e))?
    {
      return Err(PublishError::MissingArtifact { path: source });
    }

    tokio::fs::copy(&source, &dest)
      .await
      .map_err(|e| PublishError::io(&dest, e))?;
    info!(source = %source.display(), dest = %dest.display(), "crl_published");
    Ok(true)
  }
}
