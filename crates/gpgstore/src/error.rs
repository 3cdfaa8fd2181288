//! Error types for gpgstore.
//!
//! All errors are strongly typed and propagated without panicking.
//! Passphrases and secret key material are never included in error messages.

use std::path::PathBuf;

/// Store error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Cannot read store directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory already exists: {}", .0.display())]
    DirectoryExists(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Invalid keyring: {0}")]
    KeyringParse(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Corrupt message: {0}")]
    CorruptMessage(String),

    #[error("Invalid entry name: {0:?}")]
    InvalidEntryName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, StoreError>;
