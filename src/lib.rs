//! # tapedeck - Multi-track Tape Machine
//!
//! A four-track tape recorder over storage too large to hold in memory.
//!
//! ## Architecture
//!
//! tapedeck is an umbrella crate over:
//! - **tapedeck-core** - Slices, the per-track interval index, the frame window
//!   ring and position formatting. No threads, no I/O.
//! - **tapedeck-machine** - The tape machine: real-time transfer API, the
//!   butler thread that streams between window and storage, the clipboard and
//!   the storage backends.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tapedeck::prelude::*;
//! use std::time::Duration;
//!
//! let tape = tapedeck::open_file_tape("session", TapeConfig::default())?;
//! tape.wait_for_fill(Duration::from_secs(1));
//!
//! tape.punch_in(0);
//! let mut block = vec![0.0; 512];
//! tape.read_fw_into(&mut block, 0);
//! tape.record_fw(&block, 0);
//! let take = tape.punch_out(0);
//!
//! println!("{} {:?}", tape.time_string(), take);
//! # Ok::<(), tapedeck::Error>(())
//! ```

use std::path::Path;

/// Re-export of tapedeck-core for direct access
pub use tapedeck_core as core;

/// Re-export of tapedeck-machine for direct access
pub use tapedeck_machine as machine;

pub use tapedeck_core::{
    format_position, Frame, FrameWindow, Sample, Slice, SliceSet, TapeTime, NUM_TRACKS,
    SILENT_FRAME,
};

pub use tapedeck_machine::{
    ClipboardTicket, FileStorage, MemoryStorage, TapeConfig, TapeMachine, TapeMachineBuilder,
    TapeMetrics, TapeMetricsSnapshot, TapeStorage, Transfer, TransferMode,
};

mod error;
pub use error::{Error, Result};

/// Open (or create) a tape stored as raw track files in `dir`.
pub fn open_file_tape(dir: impl AsRef<Path>, config: TapeConfig) -> Result<TapeMachine> {
    let storage = FileStorage::open(dir)?;
    Ok(TapeMachine::builder()
        .config(config)
        .storage(storage)
        .build()?)
}

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        FileStorage, MemoryStorage, Sample, Slice, TapeConfig, TapeMachine, TapeStorage,
        TapeTime, NUM_TRACKS,
    };
}
