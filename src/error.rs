// src/error.rs
//! Error types for the tile entity cache

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetaError>;

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    /// The data source could not deliver entities for a tile.
    #[error("Fetch failed for tile {key}: {reason}")]
    FetchFailed { key: String, reason: String },

    /// An entity was skipped because its id or geometry was unusable.
    #[error("Malformed entity {id}: {reason}")]
    MalformedEntity { id: String, reason: String },

    #[error("WKT parse error: {0}")]
    Wkt(String),

    #[error("URL template error: {0}")]
    Template(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for MetaError {
    fn from(error: reqwest::Error) -> Self {
        MetaError::Http(error.to_string())
    }
}
