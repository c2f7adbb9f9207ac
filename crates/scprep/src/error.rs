//! Error types for the scprep library.

use std::path::PathBuf;
use thiserror::Error;

use crate::sheet::ReferenceKind;

/// Main error type for scprep operations.
#[derive(Debug, Error)]
pub enum ScprepError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid delimiter specified.
    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),

    /// Empty file or no rows to work with.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Required columns are missing from an input table.
    #[error("Invalid table '{}': missing required columns {}", path.display(), missing.join(", "))]
    Schema { path: PathBuf, missing: Vec<String> },

    /// A run folder name has no flow cell token.
    #[error("Malformed run folder name '{0}': expected '_'-delimited name ending in a flow cell ID")]
    MalformedRunName(String),

    /// Parallel identity columns have different lengths.
    #[error("Identity columns differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    /// A library type token is not recognised.
    #[error("Unknown library type '{lib_type}' for library '{library}'")]
    UnknownLibraryType { lib_type: String, library: String },

    /// A library type has no feature type mapping.
    #[error("Library type '{lib_type}' has no feature type mapping (library '{library}')")]
    UnmappedLibraryType { lib_type: String, library: String },

    /// An index name is not present in an index kit.
    #[error("Index name '{name}' not found in index kit '{kit}'")]
    UnknownIndexName { name: String, kit: String },

    /// A sequence contains a base outside ATCG.
    #[error("Invalid base '{base}' in sequence '{sequence}'")]
    InvalidBase { sequence: String, base: char },

    /// An index kit reference file is malformed.
    #[error("Invalid index kit '{}': {reason}", path.display())]
    InvalidIndexKit { path: PathBuf, reason: String },

    /// A configuration section was triggered but its reference path is absent.
    #[error("{kind} reference must be provided for sample '{sample}'")]
    MissingReference { sample: String, kind: ReferenceKind },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error saving or loading a persisted document.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Failure while producing one output artifact.
    #[error("Failed to generate '{}': {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: Box<ScprepError>,
    },
}

impl ScprepError {
    /// Attach the artifact path that was being produced.
    pub fn in_artifact(self, path: impl Into<PathBuf>) -> Self {
        ScprepError::Artifact {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Build an IO error for a path.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScprepError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for scprep operations.
pub type Result<T> = std::result::Result<T, ScprepError>;
