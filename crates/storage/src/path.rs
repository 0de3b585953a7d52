//! Path validation.
//!
//! Cache and savegame paths are derived from cartridge metadata (ids,
//! filenames, save names) that we don't control, so everything is resolved
//! lexically here before a backend joins it onto its root.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Resolves a storage path and rejects anything that would leave the root.
///
/// `.` and duplicate separators are dropped, `..` pops the previous segment,
/// and a leading `/` is treated as the storage root. Null bytes, Windows
/// prefixes and paths that resolve to nothing are rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cartridge_storage::validate_path;
///
/// assert_eq!(validate_path("Cache/1234-abcd/icon.jpg").unwrap(), Path::new("Cache/1234-abcd/icon.jpg"));
/// assert_eq!(validate_path("/Cache//1234-abcd/./42.WAV").unwrap(), Path::new("Cache/1234-abcd/42.WAV"));
/// assert!(validate_path("Savegames_and_Logs/../../etc/passwd").is_err());
/// assert!(validate_path("").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let reject = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut segments: Vec<&OsStr> = Vec::new();
    for component in original.components() {
        match component {
            // Null bytes survive Path::components() on Unix but truncate
            // the path once it reaches a syscall.
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => return Err(reject()),
            Component::Normal(segment) => segments.push(segment),
            Component::CurDir | Component::RootDir => {},
            Component::ParentDir => {
                segments.pop().ok_or_else(reject)?;
            },
            Component::Prefix(_) => return Err(reject()),
        }
    }
    if segments.is_empty() {
        return Err(reject());
    }
    Ok(segments.into_iter().collect())
}
