//! Clipboard: copy and move recorded slices through the butler.
//!
//! One transfer is in flight at a time. A [`ClipboardTicket`] holds the
//! machine's clipboard gate until its transfer has completed, so staging a
//! second transfer blocks until the first one is done. Dropping a ticket
//! without waiting still waits for the transfer, discarding its result.

use crate::butler::{ClipboardRequest, Transfer, TransferMode, Wake};
use crate::error::{Error, Result};
use crate::machine::TapeMachine;
use crossbeam_channel::{bounded, Receiver};
use parking_lot::MutexGuard;
use tapedeck_core::{check_track, Slice, TapeTime};

/// Handle to a staged clipboard transfer.
#[must_use = "dropping the ticket blocks until the transfer is done and discards its result"]
pub struct ClipboardTicket<'a> {
    done: Option<Receiver<Result<Slice>>>,
    _gate: MutexGuard<'a, ()>,
}

impl ClipboardTicket<'_> {
    /// Block until the butler has finished; returns the slice stored on the
    /// destination track.
    pub fn wait(mut self) -> Result<Slice> {
        let done = self.done.take().ok_or(Error::ClipboardClosed)?;
        done.recv().map_err(|_| Error::ClipboardClosed)?
    }
}

impl Drop for ClipboardTicket<'_> {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            // Err means the butler is gone; the gate can open either way.
            let _ = done.recv();
        }
    }
}

impl TapeMachine {
    /// Hand `transfer` to the butler, waiting for any transfer already in flight.
    pub fn stage_transfer(&self, transfer: Transfer) -> Result<ClipboardTicket<'_>> {
        check_track(transfer.from_track)?;
        check_track(transfer.to_track)?;

        let gate = self.clipboard_gate.lock();
        if self.shared.is_shutting_down() {
            return Err(Error::ClipboardClosed);
        }
        let (done, rx) = bounded(1);
        self.shared
            .wake_tx
            .send(Wake::Clipboard(ClipboardRequest { transfer, done }))
            .map_err(|_| Error::ClipboardClosed)?;

        Ok(ClipboardTicket {
            done: Some(rx),
            _gate: gate,
        })
    }

    pub fn stage_copy(
        &self,
        from_track: usize,
        from_slice: Slice,
        to_track: usize,
        to_time: TapeTime,
    ) -> Result<ClipboardTicket<'_>> {
        self.stage_transfer(Transfer {
            from_track,
            from_slice,
            to_track,
            to_time,
            mode: TransferMode::Copy,
        })
    }

    /// Copy `from_slice` of `from_track` to `to_time` on `to_track`.
    ///
    /// Unrecorded positions inside `from_slice` are copied as silence.
    /// Blocks until the copy is in storage and in the window.
    pub fn copy_slice(
        &self,
        from_track: usize,
        from_slice: Slice,
        to_track: usize,
        to_time: TapeTime,
    ) -> Result<Slice> {
        self.stage_copy(from_track, from_slice, to_track, to_time)?
            .wait()
    }

    /// Like [`copy_slice`](Self::copy_slice), then erase the recorded parts
    /// of `from_slice` from the source track.
    pub fn move_slice(
        &self,
        from_track: usize,
        from_slice: Slice,
        to_track: usize,
        to_time: TapeTime,
    ) -> Result<Slice> {
        self.stage_transfer(Transfer {
            from_track,
            from_slice,
            to_track,
            to_time,
            mode: TransferMode::Move,
        })?
        .wait()
    }
}
