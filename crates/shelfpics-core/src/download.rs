use crate::poll::{PollPolicy, poll_until};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Names longer than this are taken for browser-generated download names
pub const LONG_NAME_THRESHOLD: usize = 21;

/// Extensions Chrome and friends give a download that is still in flight
const PARTIAL_EXTENSIONS: [&str; 3] = ["crdownload", "tmp", "part"];

/// File name an item's archive is stored under
pub fn archive_name(item_code: &str) -> String {
    let safe: String = item_code
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.zip", safe)
}

/// Names of the regular files currently in `dir`
pub fn snapshot(dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn is_partial(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PARTIAL_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// True while the browser still writes `name` under a partial-download name
fn has_partial_sibling(name: &str, names: &BTreeSet<String>) -> bool {
    PARTIAL_EXTENSIONS
        .iter()
        .any(|ext| names.contains(&format!("{}.{}", name, ext)))
}

/// Wait until a finished file that was not in `before` shows up in `dir`.
///
/// A candidate must be non-empty, have no `.crdownload`-style sibling and
/// report the same size on two consecutive checks.
pub async fn wait_for_new_file(
    dir: &Path,
    before: &BTreeSet<String>,
    policy: &PollPolicy,
) -> Result<Option<PathBuf>> {
    let mut last_seen: Option<(String, u64)> = None;

    poll_until(policy, async |attempt| {
        let now = snapshot(dir)?;
        let mut candidate = None;
        for name in now.difference(before) {
            if is_partial(name) || has_partial_sibling(name, &now) {
                continue;
            }
            let len = match std::fs::metadata(dir.join(name)) {
                Ok(meta) => meta.len(),
                Err(_) => continue,
            };
            if len > 0 {
                candidate = Some((name.clone(), len));
                break;
            }
        }

        let Some(current) = candidate else {
            tracing::debug!("No finished download yet (check {})", attempt);
            last_seen = None;
            return Ok(None);
        };

        if last_seen.as_ref() == Some(&current) {
            return Ok(Some(dir.join(current.0)));
        }
        tracing::debug!("{} is {} bytes, waiting for it to settle", current.0, current.1);
        last_seen = Some(current);
        Ok(None)
    })
    .await
}

/// Rename a downloaded file to the item's archive name
pub fn claim_download(dir: &Path, downloaded: &Path, item_code: &str) -> Result<PathBuf> {
    let target = dir.join(archive_name(item_code));
    std::fs::rename(downloaded, &target).map_err(|e| {
        Error::Download(format!(
            "cannot rename {} to {}: {}",
            downloaded.display(),
            target.display(),
            e
        ))
    })?;

    tracing::info!("Saved {}", target.display());
    Ok(target)
}

/// Rename every file with a long, browser-generated name to the item's
/// archive name. Returns the original paths that were renamed.
pub fn rename_long_named(dir: &Path, item_code: &str) -> Result<Vec<PathBuf>> {
    let target = dir.join(archive_name(item_code));
    let mut renamed = Vec::new();

    for name in snapshot(dir)? {
        if name.chars().count() <= LONG_NAME_THRESHOLD {
            continue;
        }
        let source = dir.join(&name);
        tracing::debug!("Renaming {} to {}", name, target.display());
        std::fs::rename(&source, &target)?;
        renamed.push(source);
    }

    Ok(renamed)
}
