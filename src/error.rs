//! Error type for the tapedeck umbrella crate.
//!
//! Wraps the member crate errors so `?` propagates across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tapedeck_core::Error),

    #[error("Tape machine: {0}")]
    Machine(#[from] tapedeck_machine::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
