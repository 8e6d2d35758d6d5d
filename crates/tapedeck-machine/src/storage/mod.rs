//! Durable storage behind the tape.
//!
//! The butler thread is the only client of a [`TapeStorage`]; it owns the
//! backend outright, so implementations need `Send` but no internal locking.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;
use tapedeck_core::{Frame, Sample, Slice};

/// Backend holding the full tape.
///
/// Positions that were never written read back as silence.
pub trait TapeStorage: Send + 'static {
    /// Read every track over `range` into `out` (`out.len() == range.len()`).
    fn read(&mut self, range: Slice, out: &mut [Frame]) -> Result<()>;

    /// Read one track over `range` into `out` (`out.len() == range.len()`).
    fn read_track(&mut self, track: usize, range: Slice, out: &mut [Sample]) -> Result<()>;

    /// Write one track over `range` (`samples.len() == range.len()`).
    fn write(&mut self, track: usize, range: Slice, samples: &[Sample]) -> Result<()>;

    /// Slice map persisted for `track`.
    fn load_slices(&mut self, _track: usize) -> Result<Vec<Slice>> {
        Ok(Vec::new())
    }

    /// Persist the slice map of `track`.
    fn store_slices(&mut self, _track: usize, _slices: &[Slice]) -> Result<()> {
        Ok(())
    }
}

impl<S: TapeStorage + ?Sized> TapeStorage for Box<S> {
    fn read(&mut self, range: Slice, out: &mut [Frame]) -> Result<()> {
        (**self).read(range, out)
    }

    fn read_track(&mut self, track: usize, range: Slice, out: &mut [Sample]) -> Result<()> {
        (**self).read_track(track, range, out)
    }

    fn write(&mut self, track: usize, range: Slice, samples: &[Sample]) -> Result<()> {
        (**self).write(track, range, samples)
    }

    fn load_slices(&mut self, track: usize) -> Result<Vec<Slice>> {
        (**self).load_slices(track)
    }

    fn store_slices(&mut self, track: usize, slices: &[Slice]) -> Result<()> {
        (**self).store_slices(track, slices)
    }
}

/// Shared argument check for backends.
pub(crate) fn check_len(range: Slice, len: usize) -> Result<()> {
    if range.len() == len {
        Ok(())
    } else {
        Err(crate::Error::Storage(format!(
            "buffer of {} frames does not match range {}..{}",
            len, range.start, range.end
        )))
    }
}
