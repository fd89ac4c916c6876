//! Instance directory materialization.

use std::path::Path;

use easyca_policy::ProtocolGeneration;
use tracing::debug;

use crate::error::PublishError;

/// Create the instance's directory skeleton.
///
/// `<instance>/` and `<instance>/easy-rsa/` always; Legacy additionally gets
/// `easy-rsa/keys/` since the 2.x tooling expects the key store to exist.
/// Existing directories are left alone apart from mode and group, so the
/// call is safe on every invocation.
pub async fn materialize_tree(
  instance_dir: &Path,
  generation: ProtocolGeneration,
  group: Option<u32>,
) -> Result<(), PublishError> {
  let easy_rsa = instance_dir.join("easy-rsa");

  ensure_dir(instance_dir, 0o750, group).await?;
  ensure_dir(&easy_rsa, 0o750, group).await?;
  if generation == ProtocolGeneration::Legacy {
    // The key store itself is never group-readable.
    ensure_dir(&easy_rsa.join("keys"), 0o700, None).await?;
  }

  Ok(())
}

async fn ensure_dir(path: &Path, mode: u32, group: Option<u32>) -> Result<(), PublishError> {
  use std::os::unix::fs::PermissionsExt;

  tokio::fs::create_dir_all(path)
    .await
    .map_err(|e| PublishError::io(path, e))?;
  tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    .await
    .map_err(|e| PublishError::io(path, e))?;

  if let Some(gid) = group {
    std::os::unix::fs::chown(path, None, Some(gid)).map_err(|e| PublishError::io(path, e))?;
  }

  debug!(path = %path.display(), mode = format!("{mode:o}"), "directory_materialized");
  Ok(())
}
