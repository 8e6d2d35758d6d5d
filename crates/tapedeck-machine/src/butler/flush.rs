//! Write-back of recorded frames and slice maps.
//!
//! Both passes copy what they need while holding the state lock and talk to
//! storage only after releasing it. Recorded frames that fail to reach
//! storage are parked on the shared state and retried first on the next pass;
//! slice maps that fail are re-marked changed.

use super::shared_state::{PendingWrite, SharedTape};
use crate::storage::TapeStorage;
use tapedeck_core::{Slice, NUM_TRACKS};
use tracing::{debug, warn};

/// Persist parked writes, then the recorded parts of every unflushed span.
///
/// Writes go out oldest first and stop at the first failure, so a retry can
/// never land older samples over newer ones. Returns false if anything is
/// left parked.
pub(crate) fn flush_writes(shared: &SharedTape, storage: &mut dyn TapeStorage) -> bool {
    let jobs = {
        let mut state = shared.state.lock();
        let mut jobs = std::mem::take(&mut state.parked);
        for track in 0..NUM_TRACKS {
            let Some(span) = state.unflushed[track].take() else {
                continue;
            };
            // Unrecorded positions are never persisted.
            for range in state.tracks[track].recorded_parts(span) {
                let mut samples = Vec::with_capacity(range.len());
                state.window.copy_track(range, track, &mut samples);
                jobs.push(PendingWrite {
                    track,
                    range,
                    samples,
                });
            }
        }
        jobs
    };

    if jobs.is_empty() {
        return true;
    }

    let mut jobs = jobs.into_iter();
    let mut parked = Vec::new();
    for job in jobs.by_ref() {
        match storage.write(job.track, job.range, &job.samples) {
            Ok(()) => {
                shared.metrics.record_write(job.samples.len() as u64);
                debug!(
                    track = job.track,
                    start = job.range.start,
                    end = job.range.end,
                    "flushed"
                );
            }
            Err(e) => {
                shared.metrics.record_storage_fault();
                warn!(
                    track = job.track,
                    start = job.range.start,
                    end = job.range.end,
                    "flush failed: {}",
                    e
                );
                parked.push(job);
                break;
            }
        }
    }
    parked.extend(jobs);

    let ok = parked.is_empty();
    if !ok {
        debug!(writes = parked.len(), "writes parked for retry");
        shared.state.lock().parked = parked;
    }
    shared.progress.notify_all();
    ok
}

/// Persist the slice map of every track whose index changed.
///
/// Returns false if any store failed.
pub(crate) fn persist_slices(shared: &SharedTape, storage: &mut dyn TapeStorage) -> bool {
    let changed: Vec<(usize, Vec<Slice>)> = {
        let mut state = shared.state.lock();
        let mut changed = Vec::new();
        for (track, slices) in state.tracks.iter_mut().enumerate() {
            if slices.take_changed() {
                changed.push((track, slices.to_vec()));
            }
        }
        changed
    };

    let mut ok = true;
    for (track, slices) in changed {
        if let Err(e) = storage.store_slices(track, &slices) {
            ok = false;
            shared.metrics.record_storage_fault();
            warn!(track, "storing slice map failed: {}", e);
            shared.state.lock().tracks[track].mark_changed();
        } else {
            debug!(track, count = slices.len(), "slice map stored");
        }
    }
    ok
}
