use crate::{Error, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of unpacking one downloaded archive
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedArchive {
    pub archive: PathBuf,
    pub folder: PathBuf,
    pub images: Vec<PathBuf>,
}

/// Unpack every file in the working directory into a folder named after it
/// and give the pictures predictable names (`<base>_<n>.jpg`).
pub fn post_process(dir: &Path) -> Result<Vec<ExtractedArchive>> {
    let mut archives = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            archives.push(entry.path());
        }
    }
    archives.sort();

    tracing::info!("Unpacking {} archives in {}", archives.len(), dir.display());

    archives
        .iter()
        .map(|archive| extract_archive(archive, dir))
        .collect()
}

/// Unpack a single archive into `<dir>/<base name>/`
pub fn extract_archive(archive: &Path, dir: &Path) -> Result<ExtractedArchive> {
    let base = archive
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| Error::Archive(format!("unusable archive name: {}", archive.display())))?;

    let folder = dir.join(base);
    if folder.exists() {
        fs::remove_dir_all(&folder)?;
    }
    fs::create_dir_all(&folder)?;

    let count = unzip(archive, &folder)?;
    tracing::debug!("{}: {} entries extracted", archive.display(), count);

    let images = rename_extracted(&folder, base)?;
    tracing::info!("{} -> {} pictures", base, images.len());

    Ok(ExtractedArchive {
        archive: archive.to_path_buf(),
        folder,
        images,
    })
}

fn unzip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| Error::Archive(format!("{}: {}", archive.display(), e)))?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping unsafe entry '{}' in {}", entry.name(), archive.display());
            continue;
        };

        let out_path = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)
            .map_err(|e| Error::Archive(format!("{}: {}", out_path.display(), e)))?;
        written += 1;
    }

    Ok(written)
}

/// Flatten the extracted tree into `<base>_<n>.jpg`, numbered in sorted
/// path order
fn rename_extracted(folder: &Path, base: &str) -> Result<Vec<PathBuf>> {
    let mut extracted = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Archive(e.to_string()))?;
        if entry.file_type().is_file() {
            extracted.push(entry.into_path());
        }
    }

    // Stage under temporary names first so no extracted file is clobbered
    // by a final name it happens to share.
    let mut staged = Vec::with_capacity(extracted.len());
    for (index, path) in extracted.iter().enumerate() {
        let temp = folder.join(format!(".shelfpics-staging-{}", index));
        fs::rename(path, &temp)?;
        staged.push(temp);
    }

    let mut images = Vec::with_capacity(staged.len());
    for (index, temp) in staged.iter().enumerate() {
        let target = folder.join(format!("{}_{}.jpg", base, index));
        fs::rename(temp, &target)?;
        images.push(target);
    }

    for entry in WalkDir::new(folder).min_depth(1).contents_first(true) {
        let entry = entry.map_err(|e| Error::Archive(e.to_string()))?;
        if entry.file_type().is_dir() {
            let _ = fs::remove_dir(entry.path());
        }
    }

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_pictures_are_renamed_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        write_zip(&dir.join("7725.zip"), &[("b.png", "second"), ("a.png", "first")]);

        let results = post_process(dir).unwrap();

        assert_eq!(results.len(), 1);
        let folder = dir.join("7725");
        assert_eq!(results[0].folder, folder);
        assert_eq!(
            results[0].images,
            vec![folder.join("7725_0.jpg"), folder.join("7725_1.jpg")]
        );
        assert_eq!(fs::read(folder.join("7725_0.jpg")).unwrap(), b"first");
        assert_eq!(fs::read(folder.join("7725_1.jpg")).unwrap(), b"second");
        assert!(dir.join("7725.zip").exists());
    }

    #[test]
    fn test_nested_entries_are_flattened() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        write_zip(
            &dir.join("Bella.zip"),
            &[("front/1.jpg", "1"), ("back/2.jpg", "2"), ("cover.jpg", "3")],
        );

        let results = post_process(dir).unwrap();

        let folder = dir.join("Bella");
        assert_eq!(results[0].images.len(), 3);
        assert!(!folder.join("front").exists());
        assert!(!folder.join("back").exists());
        // back/ sorts before cover.jpg and front/
        assert_eq!(fs::read(folder.join("Bella_0.jpg")).unwrap(), b"2");
    }

    #[test]
    fn test_existing_final_names_are_not_clobbered() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        write_zip(&dir.join("x.zip"), &[("a.png", "a"), ("x_0.jpg", "b")]);

        let results = post_process(dir).unwrap();

        let folder = dir.join("x");
        assert_eq!(results[0].images.len(), 2);
        assert_eq!(fs::read(folder.join("x_0.jpg")).unwrap(), b"a");
        assert_eq!(fs::read(folder.join("x_1.jpg")).unwrap(), b"b");
    }

    #[test]
    fn test_reprocessing_replaces_folder() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        write_zip(&dir.join("9.zip"), &[("a.png", "a")]);

        post_process(dir).unwrap();
        let results = post_process(dir).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(fs::read_dir(dir.join("9")).unwrap().count(), 1);
    }

    #[test]
    fn test_non_archive_fails() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("notes.zip"), b"plain text").unwrap();

        let err = post_process(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }
}
