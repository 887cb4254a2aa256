//! Error types for chunking and delta operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for cdelta operations.
pub type Result<T> = std::result::Result<T, CdcError>;

/// Errors that can occur while chunking, encoding or reconstructing.
#[derive(Error, Debug)]
pub enum CdcError {
    /// Concatenated chunk bytes do not hash to the source hash.
    ///
    /// This points at a defect in the chunking logic, not a transient failure.
    #[error("Integrity violation: source hash {expected}, chunk concatenation hash {actual}")]
    IntegrityViolation {
        /// Hex SHA-256 of the source stream
        expected: String,
        /// Hex SHA-256 of the written chunks in manifest order
        actual: String,
    },

    /// A chunk directory has no manifest.
    #[error("Manifest not found: {}", .0.display())]
    MissingManifest(PathBuf),

    /// A delta artifact directory does not exist.
    #[error("Delta source not found: {}", .0.display())]
    MissingDeltaSource(PathBuf),

    /// A delta directory holds conflicting artifacts.
    #[error("Invalid artifact set: {0}")]
    InvalidArtifactSet(String),

    /// The manifest exists but does not describe a valid chunk sequence.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Chunker or delta parameters are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The compression filter rejected the data.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
