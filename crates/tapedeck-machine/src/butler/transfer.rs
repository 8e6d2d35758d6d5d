//! Clipboard transfers, executed on the butler thread.

use super::request::{Transfer, TransferMode};
use super::shared_state::SharedTape;
use crate::error::Result;
use crate::storage::TapeStorage;
use tapedeck_core::{check_track, Error as CoreError, Sample, Slice};

/// Copy (or move) the source slice to its destination.
///
/// Storage is updated first, then the window slots of the destination, and
/// only then the destination index, so a reader that sees the new slice also
/// sees its samples. Returns the slice stored on the destination track, which
/// includes any neighbours it merged with.
pub(crate) fn run_transfer(
    shared: &SharedTape,
    storage: &mut dyn TapeStorage,
    transfer: &Transfer,
) -> Result<Slice> {
    check_track(transfer.from_track)?;
    check_track(transfer.to_track)?;
    let source = transfer.from_slice;
    if !source.is_valid() {
        return Err(CoreError::InvalidSlice {
            start: source.start,
            end: source.end,
        }
        .into());
    }
    let dest = transfer.destination();

    let mut samples = vec![0.0; source.len()];
    storage
        .read_track(transfer.from_track, source, &mut samples)
        .map_err(|e| {
            shared.metrics.record_storage_fault();
            e
        })?;
    shared.metrics.record_read(samples.len() as u64);

    let recorded = {
        let state = shared.state.lock();
        state.overlay_parked_track(transfer.from_track, source, &mut samples);
        state.tracks[transfer.from_track].recorded_parts(source)
    };
    silence_unrecorded(&mut samples, source, &recorded);

    storage
        .write(transfer.to_track, dest, &samples)
        .map_err(|e| {
            shared.metrics.record_storage_fault();
            e
        })?;
    shared.metrics.record_write(samples.len() as u64);

    let mut state = shared.state.lock();
    state.window.overwrite_track(dest, transfer.to_track, &samples);
    if transfer.mode == TransferMode::Move {
        let source_index = &mut state.tracks[transfer.from_track];
        for part in recorded {
            source_index.cut(part.start);
            source_index.cut(part.end);
            source_index.erase(part);
        }
    }
    let stored = state.tracks[transfer.to_track]
        .add_slice(dest)
        .unwrap_or(dest);
    drop(state);

    shared.metrics.record_clipboard_transfer();
    shared.progress.notify_all();
    Ok(stored)
}

/// Zero every sample of `range` not covered by `recorded`.
fn silence_unrecorded(samples: &mut [Sample], range: Slice, recorded: &[Slice]) {
    let mut cursor = range.start;
    for part in recorded.iter().chain(std::iter::once(&Slice::empty_at(range.end))) {
        for pos in cursor..part.start {
            samples[(pos - range.start) as usize] = 0.0;
        }
        cursor = cursor.max(part.end);
    }
}
