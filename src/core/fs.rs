//! Filesystem helpers for reading patch bytes.
//!
//! Explicitly out of the core per spec §1: the core never touches the
//! filesystem itself (raw bytes always arrive as a `&[u8]` parameter to
//! `PatchKit::apply`). These are thin wrappers over `std::fs`, grounded on
//! the teacher's `core/db.rs` path-join + `create_dir_all` helper style.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::PatchKitError;

/// Read an entire patch file into memory.
pub fn read_patch_file(path: impl AsRef<Path>) -> Result<Vec<u8>, PatchKitError> {
    fs::read(path.as_ref()).map_err(PatchKitError::from)
}

/// List `.json` patch files directly inside `dir`, sorted by file name for
/// deterministic ordering across platforms.
pub fn iter_patch_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, PatchKitError> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_patch_file_returns_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"{\"version\":1}").unwrap();

        let bytes = read_patch_file(&path).unwrap();
        assert_eq!(bytes, b"{\"version\":1}");
    }

    #[test]
    fn read_patch_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_patch_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, PatchKitError::Io(_)));
    }

    #[test]
    fn iter_patch_files_is_sorted_and_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let files = iter_patch_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}
