//! Error types for TrueGIS state management.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for TrueGIS operations.
pub type Result<T> = std::result::Result<T, TruegisError>;

/// Errors that can occur in TrueGIS state management.
#[derive(Error, Debug)]
pub enum TruegisError {
    // Import / export errors
    #[error("Failed to parse GeoJSON: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // File errors (CLI session directories, history persistence)
    #[error("Failed to read file: {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Session errors
    #[error("Session not found: {path}")]
    SessionNotFound { path: PathBuf },

    #[error("Session already exists: {path}")]
    SessionAlreadyExists { path: PathBuf },

    #[error("No feature at index {index} (store holds {len})")]
    FeatureIndexOutOfRange { index: usize, len: usize },

    #[error("Invalid coordinate '{text}': expected 'lon,lat'")]
    InvalidCoordinate { text: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TruegisError {
    /// Wrap a serde_json error from malformed import text.
    ///
    /// Distinct from [`TruegisError::Json`] so callers can tell "the user's
    /// file is bad" apart from "we failed to serialize our own state".
    pub fn parse(source: serde_json::Error) -> Self {
        TruegisError::Parse { source }
    }

    /// Returns a user-facing recovery suggestion, if one applies.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            TruegisError::Parse { .. } => {
                Some("The file is not valid GeoJSON. Check the export source and try again.")
            }
            TruegisError::SessionNotFound { .. } => {
                Some("Run 'truegis-cli init <dir>' to create a session first.")
            }
            TruegisError::FeatureIndexOutOfRange { .. } => {
                Some("Run 'truegis-cli status <dir>' to list feature indices.")
            }
            _ => None,
        }
    }
}
