use anyhow::{Context, Result, bail};
use console::style;
use shelfpics_core::Settings;
use shelfpics_core::archive::{ExtractedArchive, post_process};
use std::path::{Path, PathBuf};

/// Unpack the archives in `dir`, or in the configured working directory
pub fn execute(config: &Path, dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => {
            Settings::from_file(config)
                .with_context(|| format!("invalid configuration in {}", config.display()))?
                .base_dir
        }
    };

    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }

    println!("📦 Unpacking archives in {}", dir.display());
    let extracted = post_process(&dir)?;
    print_extracted(&extracted);

    Ok(())
}

pub(crate) fn print_extracted(extracted: &[ExtractedArchive]) {
    if extracted.is_empty() {
        println!("No archives to unpack.");
        return;
    }

    for item in extracted {
        println!(
            "  {} {} → {} ({} pictures)",
            style("✓").green(),
            item.archive
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default(),
            item.folder.display(),
            item.images.len()
        );
    }

    let pictures: usize = extracted.iter().map(|item| item.images.len()).sum();
    println!(
        "✅ Unpacked {} archive(s), {} picture(s)",
        extracted.len(),
        pictures
    );
}
