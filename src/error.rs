//! Crate error types

use thiserror::Error;

/// Errors surfaced by the fetch, persistence and server layers.
///
/// Value parsing never fails (it yields `NaN`) and a corrupt snapshot falls
/// back to defaults, so neither has a variant here.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Endpoint answered with status {0}")]
    Status(u16),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scrape error: {0}")]
    Scrape(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
