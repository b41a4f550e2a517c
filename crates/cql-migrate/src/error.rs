//! Error types for the script generator.

use std::path::PathBuf;

/// Errors that can occur while loading a diff or generating a script.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// IO error (reading diff documents, registries or model files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON file could not be read into its typed form.
    #[error("Failed to parse '{path}': {source}")]
    ParseError {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The diff tree is structurally valid JSON but cannot be compiled.
    #[error("Malformed diff at '{path}': {message}")]
    MalformedDiff {
        /// Slash-separated location of the node in the diff tree.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Shorthand for [`MigrateError::MalformedDiff`].
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDiff {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for script generation.
pub type Result<T> = std::result::Result<T, MigrateError>;
