//! Error types for the ownomail-store crate.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the options file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The options could not be encoded.
    #[error("Failed to encode options: {0}")]
    Encode(#[from] ron::Error),

    /// The options file is corrupted or not in the expected format.
    #[error("Failed to decode options: {0}")]
    Decode(#[from] ron::error::SpannedError),

    /// The configured store path was rejected.
    #[error("Invalid store path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let err = StoreError::InvalidPath {
            path: "../options.ron".to_string(),
            reason: "cannot contain '..' components".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid store path ../options.ron: cannot contain '..' components"
        );
    }

    #[test]
    fn test_io_conversion() {
        let err: StoreError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
