//! Path utilities for tests that write container files.

use std::path::{Path, PathBuf};

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Path of a container file named `name` inside `dir`.
///
/// Nothing is created on disk.
pub fn store_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.fst", name))
}

/// Create `path` as an empty file, truncating anything already there.
pub fn touch_empty(path: &Path) -> PathBuf {
    std::fs::File::create(path).expect("Failed to create empty file");
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_and_touch() {
        let dir = temp_test_dir();
        let path = store_path(dir.path(), "analysis");
        assert!(path.ends_with("analysis.fst"));
        assert!(!path.exists());

        touch_empty(&path);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
