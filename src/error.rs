//! Error types for Folio annotations
//!
//! Only the edges of the crate return these: storage backends, configuration
//! loading and the replay script. The record store, reconciler and sync
//! engine absorb their failures so that annotation problems never block
//! document viewing.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Annotation error type
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Script error: {0}")]
    Script(String),
}

impl AnnotationError {
    /// Short machine-readable category, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            AnnotationError::Io(_) => "io_error",
            AnnotationError::Serialization(_) => "serialization_error",
            AnnotationError::Storage(_) => "storage_error",
            AnnotationError::Config(_) => "config_error",
            AnnotationError::Script(_) => "script_error",
        }
    }
}
