//! Messages sent to the butler thread.

use crate::error::Result;
use crossbeam_channel::Sender;
use tapedeck_core::{Slice, TapeTime};

/// What a clipboard transfer does with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Leave the source slice in place.
    Copy,
    /// Erase the source slice from its track once the copy has landed.
    Move,
}

/// One clipboard transfer: a recorded slice moved between tracks/positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from_track: usize,
    pub from_slice: Slice,
    pub to_track: usize,
    pub to_time: TapeTime,
    pub mode: TransferMode,
}

impl Transfer {
    /// Destination range on `to_track`.
    pub fn destination(&self) -> Slice {
        self.from_slice.moved_to(self.to_time)
    }
}

/// Staged transfer plus the completion channel the caller is waiting on.
pub(crate) struct ClipboardRequest {
    pub transfer: Transfer,
    pub done: Sender<Result<Slice>>,
}

/// Reason the butler was woken.
pub(crate) enum Wake {
    /// Valid frames on one side of the play point fell below the low-water mark.
    LowWater,
    /// The play point left the valid span.
    Relocate,
    /// Frames were written into the window.
    Written,
    /// A slice index changed.
    SlicesChanged,
    /// A clipboard transfer is staged.
    Clipboard(ClipboardRequest),
    Shutdown,
}

impl std::fmt::Debug for Wake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Wake::LowWater => write!(f, "LowWater"),
            Wake::Relocate => write!(f, "Relocate"),
            Wake::Written => write!(f, "Written"),
            Wake::SlicesChanged => write!(f, "SlicesChanged"),
            Wake::Clipboard(req) => f.debug_tuple("Clipboard").field(&req.transfer).finish(),
            Wake::Shutdown => write!(f, "Shutdown"),
        }
    }
}
