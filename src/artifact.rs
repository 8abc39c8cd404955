//! Reading and writing intermediate artifacts.
//!
//! Every stage persists its output as UTF-8 text or pretty-printed JSON. Directory listings are
//! always sorted by file name so that anything derived from enumeration order (disambiguation
//! ranks in particular) is reproducible across filesystems.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a UTF-8 text file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Write a UTF-8 text file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

/// Deserialize a JSON artifact.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not match `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| Error::json(path, e))
}

/// Serialize a value as pretty JSON (non-ASCII kept as is).
///
/// # Errors
///
/// Returns an error if serialisation or the write fails.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::json(path, e))?;
    write_text(path, &json)
}

/// Create a directory and its parents.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Remove `path` with everything below it, then create it again empty.
///
/// # Errors
///
/// Returns an error if the old directory cannot be removed or the new one created.
pub fn reset_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    ensure_dir(path)
}

/// Copy a file, creating the destination's parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the copy fails.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(from, to).map(|_| ()).map_err(|e| Error::io(from, e))
}

/// Files directly inside `dir` with the given extension, sorted by file name.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = list_dir(dir)?
        .into_iter()
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        })
        .collect();
    files.sort_by_key(|p| p.file_name().map(std::ffi::OsStr::to_os_string));
    Ok(files)
}

/// Subdirectories directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = list_dir(dir)?.into_iter().filter(|p| p.is_dir()).collect();
    dirs.sort_by_key(|p| p.file_name().map(std::ffi::OsStr::to_os_string));
    Ok(dirs)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(|e| Error::io(dir, e))?.path());
    }
    Ok(paths)
}

#[must_use]
/// Replace characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

#[must_use]
/// File stem as an owned string, empty when the path has none.
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
