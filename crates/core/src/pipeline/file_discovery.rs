//! Finds the photos a run should consider.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::features::domain::image_inspector::ImageInspector;
use crate::shared::constants::IMAGE_EXTENSIONS;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("input path {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to read existing filenames from {path}: {source}")]
    ExistingFilenamesIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("existing filenames file {path} is not a JSON array of strings: {source}")]
    ExistingFilenamesParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Recursively lists readable images under `root`, sorted by name within
/// each directory.
///
/// macOS metadata entries (`._*`, `.DS_Store`) are skipped, directories
/// included. A file must carry an image extension and report non-zero
/// dimensions through `inspector`. Files whose name is in `exclude` are
/// left out.
pub fn discover_photos(
    root: &Path,
    inspector: &dyn ImageInspector,
    exclude: &HashSet<String>,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }

    let mut photos = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_metadata(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_image_extension(entry.path()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if exclude.contains(name.as_ref()) {
            log::debug!("Skipping existing {}", entry.path().display());
            continue;
        }
        match inspector.dimensions(entry.path()) {
            Ok((w, h)) if w > 0 && h > 0 => photos.push(entry.into_path()),
            Ok(_) => log::debug!("Skipping empty image {}", entry.path().display()),
            Err(e) => log::debug!("Skipping {}: {e}", entry.path().display()),
        }
    }

    log::info!("Discovered {} photos under {}", photos.len(), root.display());
    Ok(photos)
}

/// Reads a JSON array of filenames.
pub fn load_existing_filenames(path: &Path) -> Result<HashSet<String>, DiscoveryError> {
    let text = fs::read_to_string(path).map_err(|source| DiscoveryError::ExistingFilenamesIo {
        path: path.to_path_buf(),
        source,
    })?;
    let names: Vec<String> =
        serde_json::from_str(&text).map_err(|source| DiscoveryError::ExistingFilenamesParse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(names.into_iter().collect())
}

fn is_metadata(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with("._") || name == ".DS_Store"
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::BoxError;
    use rstest::rstest;

    /// Treats files whose content starts with "img" as 10x10 images.
    struct ContentInspector;

    impl ImageInspector for ContentInspector {
        fn dimensions(&self, path: &Path) -> Result<(u32, u32), BoxError> {
            let bytes = fs::read(path)?;
            if bytes.starts_with(b"img") {
                Ok((10, 10))
            } else {
                Err("not an image".into())
            }
        }

        fn average_saturation(&self, _path: &Path) -> Result<f64, BoxError> {
            Ok(0.0)
        }
    }

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn relative(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_recursive_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "b.jpg", "img");
        touch(root, "a.PNG", "img");
        touch(root, "sub/c.tiff", "img");
        touch(root, "notes.txt", "img");
        touch(root, "clip.jpg", "video");
        touch(root, "._a.jpg", "img");
        touch(root, ".DS_Store", "img");
        touch(root, "._meta/d.jpg", "img");

        let photos = discover_photos(root, &ContentInspector, &HashSet::new()).unwrap();

        assert_eq!(relative(root, &photos), vec!["a.PNG", "b.jpg", "sub/c.tiff"]);
    }

    #[test]
    fn test_excludes_existing_filenames() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.jpg", "img");
        touch(dir.path(), "sub/b.jpg", "img");
        let exclude: HashSet<String> = ["b.jpg".to_string()].into_iter().collect();

        let photos = discover_photos(dir.path(), &ContentInspector, &exclude).unwrap();

        assert_eq!(relative(dir.path(), &photos), vec!["a.jpg"]);
    }

    #[test]
    fn test_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.jpg", "img");
        let result = discover_photos(&dir.path().join("a.jpg"), &ContentInspector, &HashSet::new());
        assert!(matches!(result, Err(DiscoveryError::NotADirectory(_))));
    }

    #[rstest]
    #[case("photo.jpg", true)]
    #[case("photo.JPEG", true)]
    #[case("scan.tif", true)]
    #[case("movie.mov", false)]
    #[case("noext", false)]
    fn test_has_image_extension(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(has_image_extension(Path::new(name)), expected);
    }

    #[test]
    fn test_load_existing_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing.json");
        fs::write(&path, r#"["a.jpg", "b.jpg", "a.jpg"]"#).unwrap();

        let names = load_existing_filenames(&path).unwrap();

        assert_eq!(names.len(), 2);
        assert!(names.contains("b.jpg"));
    }

    #[test]
    fn test_load_existing_filenames_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_existing_filenames(&missing),
            Err(DiscoveryError::ExistingFilenamesIo { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"a": 1}"#).unwrap();
        assert!(matches!(
            load_existing_filenames(&bad),
            Err(DiscoveryError::ExistingFilenamesParse { .. })
        ));
    }
}
