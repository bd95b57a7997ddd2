//! Error types for the sample path, the transport and the file-backed stores.

use std::io;
use thiserror::Error;

/// Failures of the sample source. `Open` is fatal to a start attempt;
/// `Read` only skips the current iteration.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {source_name}: {reason}")]
    Open { source_name: String, reason: String },
    #[error("read error: {0}")]
    Read(#[from] io::Error),
    #[error("source closed")]
    Closed,
}

/// A line that arrived intact but is not a `<int>\t<int>` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedSample {
    #[error("expected 2 fields, got {0}")]
    FieldCount(usize),
    #[error("not an integer: {0:?}")]
    NotInteger(String),
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset file: {0}")]
    Io(#[from] io::Error),
    #[error("preset json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file: {0}")]
    Io(#[from] io::Error),
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}
