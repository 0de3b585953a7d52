//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    FileNotFound(#[error(not(source))] PathBuf),
    /// The configuration file extension isn't one we can parse.
    #[display("unsupported configuration format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A provider could not be parsed or extracted.
    #[display("failed to parse configuration")]
    Parse,
    /// A value was parsed but is not acceptable.
    #[display("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
    /// No storage root configured and no platform data directory available.
    #[display("no storage root configured")]
    NoStorageRoot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::Invalid { field: "images.jpeg_quality", reason: "must be between 1 and 100" }.to_string(),
            "invalid value for images.jpeg_quality: must be between 1 and 100"
        );
        let kind = ErrorKind::UnsupportedFormat("ini".to_string());
        assert_eq!(kind.to_string(), "unsupported configuration format: ini");
    }
}
