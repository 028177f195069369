//! Filesystem helpers for replace-by-rename writes
//!
//! - `temp_path_for`: sibling temp path used while a file is being written
//! - `atomic_rename`: replaces the target in one step (Windows needs an explicit delete)
//! - `write_atomic`: temp write + rename, cleaning up the temp file on failure

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Sibling temp path for `path`: same directory, file name + `.tmp`.
///
/// Keeping the temp file in the target's directory keeps the final rename on
/// one filesystem.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("index"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Cross-platform atomic rename that handles Windows file replacement.
///
/// On Unix, `fs::rename` atomically replaces the target if it exists.
/// On Windows, `fs::rename` fails if the target exists, so the target is
/// deleted first.
pub fn atomic_rename(src: &Path, dst: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }
    }
    std::fs::rename(src, dst)
}

/// Write `contents` to `path` so readers see either the old file or the new
/// one, never a partial write.
///
/// Missing parent directories are created. On failure the temp file is
/// removed and any existing file at `path` is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path_for(path);
    let result = std::fs::write(&tmp, contents).and_then(|_| atomic_rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}
