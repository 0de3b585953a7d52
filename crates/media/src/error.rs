//! Media Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A media error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source bytes are not an image we can read. Don't retry with the same input.
    #[display("invalid or corrupted image data")]
    Decode,
    /// Encoding the derived image failed.
    #[display("failed to encode image")]
    Encode,
    /// Requested dimensions cannot be produced.
    #[display("invalid target width: {_0}")]
    InvalidDimensions(#[error(not(source))] u32),
    /// Audio payload could not be converted.
    #[display("failed to transcode audio")]
    Transcode,
    /// No decoder is available for this payload.
    #[display("unsupported media: {_0}")]
    Unsupported(#[error(not(source))] &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Decode.to_string(), "invalid or corrupted image data");
        assert_eq!(ErrorKind::InvalidDimensions(0).to_string(), "invalid target width: 0");
        assert_eq!(ErrorKind::Unsupported("FDL").to_string(), "unsupported media: FDL");
    }
}
