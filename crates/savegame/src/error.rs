//! Savegame Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A savegame error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for savegame operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a save could not be read or written.
///
/// Every parse failure means the file is not a usable save; none are retryable.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not a savegame file.
    #[display("invalid savegame signature")]
    InvalidSignature,
    /// Written by a newer (or unknown) format version.
    #[display("unsupported savegame version: {_0}")]
    UnsupportedVersion(#[error(not(source))] u8),
    /// File ends before the declared data does.
    #[display("savegame truncated")]
    Truncated,
    /// File continues past the declared payload.
    #[display("unexpected data after savegame payload")]
    TrailingData,
    /// A text field is not valid UTF-8.
    #[display("invalid UTF-8 in {_0}")]
    InvalidUtf8(#[error(not(source))] &'static str),
    /// Timestamp outside the representable range.
    #[display("invalid savegame timestamp: {_0}")]
    InvalidTimestamp(#[error(not(source))] i64),
    /// Payload does not match its stored checksum.
    #[display("checksum mismatch: expected {expected:08x}, found {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    /// A field is too large for its length prefix.
    #[display("{_0} too long to encode")]
    FieldTooLong(#[error(not(source))] &'static str),
}
