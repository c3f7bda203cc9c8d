use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by the schemaledger library.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Listing the provider catalog failed. Fatal: the current identifier set is unknown.
    #[error("failed to list resource types: {message}")]
    Listing { message: String },

    /// Describing a single resource type failed. Recovered by skipping the type.
    #[error("failed to describe {type_name}: {message}")]
    Describe { type_name: String, message: String },

    /// The provider returned a schema string that is not valid JSON.
    #[error("schema for {type_name} is not valid JSON: {source}")]
    InvalidSchema {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The identifier cannot be mapped to a snapshot filename.
    #[error("invalid resource type name '{type_name}'")]
    InvalidTypeName { type_name: String },

    /// The catalog shrank so much that applying it would empty the ledger.
    #[error(
        "catalog collapse detected: {listed} type(s) listed, {removals} of {previous} tracked type(s) would be removed; refusing to apply"
    )]
    CatalogCollapse {
        previous: usize,
        listed: usize,
        removals: usize,
    },

    /// Filesystem access failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot or ledger file could not be parsed or serialized.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Querying git history failed.
    #[error("git error: {message}")]
    Git { message: String },
}

impl TrackerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Whether the error only affects one resource type and the run can continue.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::Describe { .. } | Self::InvalidSchema { .. } | Self::InvalidTypeName { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
