//! Source file discovery.
//!
//! Results are always sorted so tree expansion and plan rewriting produce the
//! same output on every run.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::errors::GuardError;

/// Recursively finds files with `extension` under `root`.
///
/// Directories the build tool ignores are skipped: hidden ones, ones starting
/// with `_`, and `testdata`.
pub fn discover_sources(root: &Path, extension: &str) -> Result<Vec<PathBuf>, GuardError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry));
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            GuardError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Source files directly inside `dir`, without descending.
pub fn list_package_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, GuardError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| GuardError::io(dir, e.into()))?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata"
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovery_is_sorted_and_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for path in ["b.go", "a.go", "notes.txt", "pkg/c.go", ".git/d.go", "testdata/e.go", "_old/f.go"] {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "package x\n").unwrap();
        }

        let found: Vec<_> = discover_sources(root, "go")
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            [PathBuf::from("a.go"), PathBuf::from("b.go"), PathBuf::from("pkg/c.go")]
        );

        let package = list_package_files(root, "go").unwrap();
        assert_eq!(package.len(), 2);
    }
}
