//! Configuration management for Folio annotations

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{AnnotationError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub ids: IdConfig,
    pub author: AuthorConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdConfig {
    /// Namespace prefix of stable ids (`<prefix><n>`)
    pub stable_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorConfig {
    /// Creator name attached to new records and comments
    pub default_creator: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentConfig {
    /// URL or path the storage key is derived from
    pub url: String,
}

pub const DEFAULT_STABLE_PREFIX: &str = "pdfjs_internal_editor_";
pub const DEFAULT_CREATOR: &str = "anonymous";

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                backend: StorageBackend::File,
                dir: PathBuf::from("./annotations"),
            },
            ids: IdConfig {
                stable_prefix: DEFAULT_STABLE_PREFIX.to_string(),
            },
            author: AuthorConfig {
                default_creator: DEFAULT_CREATOR.to_string(),
            },
            document: DocumentConfig {
                url: "document.pdf".to_string(),
            },
        }
    }
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(AnnotationError::Config(format!(
                "unknown storage backend '{}' (expected 'memory' or 'file')",
                other
            ))),
        }
    }
}

impl Config {
    /// Build the configuration from `ANNOTATIONS_*` environment variables.
    ///
    /// Unset variables keep their defaults; a value that cannot be
    /// interpreted is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let backend = match env::var("ANNOTATIONS_STORAGE") {
            Ok(value) => StorageBackend::parse(&value)?,
            Err(_) => defaults.storage.backend,
        };

        let stable_prefix = env::var("ANNOTATIONS_ID_PREFIX")
            .unwrap_or(defaults.ids.stable_prefix);
        if stable_prefix.is_empty() {
            return Err(AnnotationError::Config(
                "ANNOTATIONS_ID_PREFIX must not be empty".to_string(),
            ));
        }

        Ok(Config {
            storage: StorageConfig {
                backend,
                dir: env::var("ANNOTATIONS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.dir),
            },
            ids: IdConfig { stable_prefix },
            author: AuthorConfig {
                default_creator: env::var("ANNOTATIONS_CREATOR")
                    .ok()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(defaults.author.default_creator),
            },
            document: DocumentConfig {
                url: env::var("ANNOTATIONS_DOCUMENT").unwrap_or(defaults.document.url),
            },
        })
    }
}
