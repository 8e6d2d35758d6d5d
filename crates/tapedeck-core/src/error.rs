//! Error types for tapedeck-core.

use crate::TapeTime;
use thiserror::Error;

/// Error type for tapedeck-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid track index: {0}")]
    InvalidTrack(usize),

    #[error("Invalid slice: start={start}, end={end}")]
    InvalidSlice { start: TapeTime, end: TapeTime },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
