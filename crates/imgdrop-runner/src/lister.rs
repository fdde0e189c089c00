//! Source directory listing

use imgdrop_core::{DropError, Result, SourceConfig, UploadQueue};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Names of the regular files directly inside `dir` whose extension is in
/// `extensions` (compared case-insensitively), sorted by name.
pub fn list_images(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)) {
            debug!("Skipping {} (extension not allowed)", path.display());
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(name) => debug!("Skipping non UTF-8 file name {:?}", name),
        }
    }

    files.sort();
    Ok(files)
}

/// Build the upload queue from the configured source directory.
///
/// An empty result is fatal: there is nothing to upload.
pub fn build_queue(source: &SourceConfig) -> Result<UploadQueue> {
    let files = list_images(&source.dir, &source.extensions).map_err(|e| match e {
        DropError::Io(io) => DropError::Fatal(format!(
            "Cannot read source directory {}: {}",
            source.dir.display(),
            io
        )),
        other => other,
    })?;

    if files.is_empty() {
        return Err(DropError::Fatal(format!(
            "No {} files in {}",
            source.extensions.join("/"),
            source.dir.display()
        )));
    }

    Ok(UploadQueue::new(files))
}

/// Absolute form of the source directory.
///
/// The browser resolves a relative upload path against its own working
/// directory, so every path handed to the file input starts from here.
pub fn source_root(dir: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(dir).map_err(|e| {
        DropError::Fatal(format!("Cannot resolve source directory {}: {}", dir.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn exts() -> Vec<String> {
        vec!["jpg".to_string(), "png".to_string()]
    }

    #[test]
    fn test_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.png");
        touch(temp.path(), "a.jpg");
        touch(temp.path(), "notes.txt");
        touch(temp.path(), "noext");

        let files = list_images(temp.path(), &exts()).unwrap();
        assert_eq!(files, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn test_extension_match_ignores_case() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "SHOUT.JPG");
        touch(temp.path(), "mixed.Png");

        let files = list_images(temp.path(), &exts()).unwrap();
        assert_eq!(files, vec!["SHOUT.JPG", "mixed.Png"]);
    }

    #[test]
    fn test_subdirectories_are_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("nested.jpg")).unwrap();
        touch(&temp.path().join("nested.jpg"), "inner.jpg");
        touch(temp.path(), "top.jpg");

        let files = list_images(temp.path(), &exts()).unwrap();
        assert_eq!(files, vec!["top.jpg"]);
    }

    #[test]
    fn test_empty_directory_is_fatal() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "readme.md");

        let source = SourceConfig {
            dir: temp.path().to_path_buf(),
            extensions: exts(),
        };
        assert!(matches!(build_queue(&source), Err(DropError::Fatal(_))));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let temp = TempDir::new().unwrap();
        let source = SourceConfig {
            dir: temp.path().join("gone"),
            extensions: exts(),
        };
        assert!(matches!(build_queue(&source), Err(DropError::Fatal(_))));
    }

    #[test]
    fn test_source_root_is_absolute() {
        let root = source_root(Path::new(".")).unwrap();
        assert!(root.is_absolute());

        let temp = TempDir::new().unwrap();
        assert!(matches!(
            source_root(&temp.path().join("gone")),
            Err(DropError::Fatal(_))
        ));
    }
}
