use crate::{Error, Result};
use std::path::Path;

/// Wipe and recreate the working directory that receives browser downloads.
///
/// Deleting the old tree is best-effort; failing to recreate it is fatal.
pub fn prepare_working_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if let Err(e) = std::fs::remove_dir_all(path) {
            tracing::warn!(
                "Could not clear working directory {}: {}",
                path.display(),
                e
            );
        }
    }

    std::fs::create_dir_all(path).map_err(|e| {
        Error::Directory(format!("cannot create {}: {}", path.display(), e))
    })?;

    if !path.is_dir() {
        return Err(Error::Directory(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    tracing::info!("Working directory ready: {}", path.display());
    Ok(())
}
