use crate::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Chrome user-data directory for a portal session.
///
/// Persistent profiles keep the portal's session cookies between runs, so a
/// later login can be skipped. Temporary profiles are removed on drop.
pub struct ProfileManager {
    path: PathBuf,
    is_temporary: bool,
}

impl ProfileManager {
    /// Create a throwaway profile
    pub fn temporary() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("shelfpics-profile-")
            .tempdir()?
            .keep();

        Ok(Self {
            path,
            is_temporary: true,
        })
    }

    /// Use (and create if needed) a profile directory at `path`
    pub fn persistent(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }

        Ok(Self {
            path,
            is_temporary: false,
        })
    }

    /// Persistent profile stored under [`ProfileManager::profiles_dir`]
    pub fn named(name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::Browser(format!("invalid profile name '{}'", name)));
        }
        Self::persistent(Self::profiles_dir()?.join(name))
    }

    /// Directory holding all named profiles (`~/.shelfpics/profiles`)
    pub fn profiles_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".shelfpics").join("profiles"))
            .ok_or_else(|| Error::Browser("could not determine home directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    /// Total size of the profile on disk, in bytes
    pub fn size(&self) -> Result<u64> {
        dir_size(&self.path)
    }
}

fn dir_size(path: &Path) -> Result<u64> {
    if !path.is_dir() {
        return Err(Error::Browser(format!("profile not found: {}", path.display())));
    }

    Ok(WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum())
}

impl Drop for ProfileManager {
    fn drop(&mut self) {
        if self.is_temporary && self.path.exists() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
