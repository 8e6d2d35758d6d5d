//! Error types.

use tapedeck_core::TapeTime;
use thiserror::Error;

/// Error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Data-layer error (bad track, bad slice, bad config).
    #[error(transparent)]
    Core(#[from] tapedeck_core::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Slice map (de)serialization error.
    #[error("Slice map error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Range not addressable by the storage backend.
    #[error("Range out of storage bounds: start={start}, end={end}")]
    OutOfRange { start: TapeTime, end: TapeTime },

    /// Butler error.
    #[error("Butler error: {0}")]
    Butler(String),

    /// Clipboard transfer could not be completed because the butler is gone.
    #[error("Clipboard transfer abandoned: butler not running")]
    ClipboardClosed,
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
