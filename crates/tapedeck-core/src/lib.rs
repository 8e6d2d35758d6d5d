//! # tapedeck-core
//!
//! Data layer for the tapedeck engine. Nothing in this crate spawns threads or
//! touches storage; the concurrent machinery lives in `tapedeck-machine`.
//!
//! - [`Slice`] - half-open `[start, end)` interval of recorded material
//! - [`SliceSet`] - per-track interval index of non-overlapping slices
//! - [`FrameWindow`] - fixed-capacity ring of frames addressed by tape time
//! - [`format_position`] - `MM:SS.ss` rendering of a tape position

pub mod error;
pub mod slice;
pub mod slice_set;
pub mod time;
pub mod window;

pub use error::{Error, Result};
pub use slice::Slice;
pub use slice_set::SliceSet;
pub use time::format_position;
pub use window::FrameWindow;

/// Position on the tape, counted in frames from an arbitrary origin.
pub type TapeTime = i64;

/// One sample of one track.
pub type Sample = f32;

/// Number of tracks on the tape.
pub const NUM_TRACKS: usize = 4;

/// One sample per track at a single tape position.
pub type Frame = [Sample; NUM_TRACKS];

/// A frame of silence on every track.
pub const SILENT_FRAME: Frame = [0.0; NUM_TRACKS];

/// Check a track index against [`NUM_TRACKS`].
#[inline]
pub fn check_track(track: usize) -> Result<()> {
    if track < NUM_TRACKS {
        Ok(())
    } else {
        Err(Error::InvalidTrack(track))
    }
}
