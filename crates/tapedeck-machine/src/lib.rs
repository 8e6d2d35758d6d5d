//! Streaming tape machine.
//!
//! A [`TapeMachine`] presents four tracks of an arbitrarily long tape through
//! a fixed-size in-memory window. A background butler thread keeps the window
//! filled around the play point, writes recorded frames back to storage and
//! carries out clipboard transfers, so the real-time caller never waits on
//! storage I/O.
//!
//! # Example
//!
//! ```no_run
//! use tapedeck_machine::{MemoryStorage, Slice, TapeMachine};
//! use std::time::Duration;
//!
//! let tape = TapeMachine::builder()
//!     .window_frames(1 << 16)
//!     .storage(MemoryStorage::new())
//!     .build()?;
//! tape.wait_for_fill(Duration::from_secs(1));
//!
//! // Record a block on track 0, then play it back.
//! tape.read_fw(256, 0);
//! let mut take = Slice::empty_at(0);
//! tape.write_fw(&[0.1; 256], 0, &mut take);
//! tape.go_to(0);
//! let samples = tape.read_fw(256, 0);
//! # Ok::<(), tapedeck_machine::Error>(())
//! ```

pub mod error;
pub use error::{Error, Result};

mod machine;
pub use machine::{TapeMachine, TapeMachineBuilder};

mod clipboard;
pub use clipboard::ClipboardTicket;

pub mod butler;
pub use butler::{TapeConfig, TapeMetrics, TapeMetricsSnapshot, Transfer, TransferMode};

pub mod storage;
pub use storage::{FileStorage, MemoryStorage, TapeStorage};

pub use tapedeck_core::{
    format_position, Frame, FrameWindow, Sample, Slice, SliceSet, TapeTime, NUM_TRACKS,
};
