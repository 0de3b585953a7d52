//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the storage, media and
//! savegame crates are raised into one of these kinds, keeping the original
//! error as a child in the tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The cartridge can't be cached: missing id, unusable filename, ...
    #[display("invalid cartridge: {_0}")]
    InvalidCartridge(#[error(not(source))] &'static str),
    /// A cached file exists but can't be decoded. It is left in place.
    #[display("corrupt cache file: {}", _0.display())]
    CacheCorruption(#[error(not(source))] PathBuf),
    /// A sound resource could not be converted to a playable format.
    #[display("failed to transcode resource {_0}")]
    Transcode(#[error(not(source))] u32),
    /// Generating a derived image failed.
    #[display("failed to generate image")]
    Image,
    /// A savegame belongs to another cartridge or can't be encoded.
    #[display("invalid savegame")]
    Savegame,
    /// Reading from or writing to the storage backend failed.
    #[display("storage operation failed")]
    Storage,
    /// A blocking task panicked or was cancelled.
    #[display("background task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
