//! Window refill and relocation.

use super::config::TapeConfig;
use super::flush::flush_writes;
use super::request::Wake;
use super::shared_state::{SharedTape, TapeState};
use crate::storage::TapeStorage;
use crossbeam_channel::Receiver;
use std::sync::atomic::Ordering;
use tapedeck_core::{Frame, Slice, TapeTime, SILENT_FRAME};
use tracing::{debug, warn};

/// One storage read destined for the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FillPlan {
    pub epoch: u64,
    pub range: Slice,
}

/// Next chunk to load: ahead of the play point first, then behind it.
pub(crate) fn plan_fill(state: &TapeState, config: &TapeConfig) -> Option<FillPlan> {
    let window = &state.window;
    if !window.is_play_inside() {
        return None;
    }
    let span = window.valid_span();
    let epoch = window.epoch();
    if window.valid_ahead() < config.target_ahead() {
        Some(FillPlan {
            epoch,
            range: Slice::with_len(span.end, config.chunk_frames),
        })
    } else if window.valid_behind() < config.target_behind() {
        Some(FillPlan {
            epoch,
            range: Slice::new(span.start - config.chunk_frames as TapeTime, span.start),
        })
    } else {
        None
    }
}

/// Re-anchor the window when the play point has left the valid span.
///
/// Pending writes are flushed first. Whatever storage refuses is parked, so a
/// failing backend delays nothing here.
pub(crate) fn relocate_if_needed(shared: &SharedTape, storage: &mut dyn TapeStorage) {
    if shared.state.lock().window.is_play_inside() {
        return;
    }
    flush_writes(shared, storage);

    let mut state = shared.state.lock();
    if state.window.is_play_inside() || state.has_unflushed() {
        return;
    }
    let target = state.window.play();
    state.window.recenter(target);
    drop(state);

    shared.metrics.record_relocation();
    shared.progress.notify_all();
    debug!(position = target, "window recentered");
}

/// Load chunks until both sides reach their targets or a message arrives.
///
/// Returns false on a storage fault.
pub(crate) fn refill(
    shared: &SharedTape,
    storage: &mut dyn TapeStorage,
    scratch: &mut Vec<Frame>,
    rx: &Receiver<Wake>,
) -> bool {
    loop {
        if shared.is_shutting_down() || !rx.is_empty() {
            return true;
        }

        let plan = plan_fill(&shared.state.lock(), &shared.config);
        let Some(plan) = plan else {
            shared.fill_requested.store(false, Ordering::Release);
            return true;
        };

        scratch.clear();
        scratch.resize(plan.range.len(), SILENT_FRAME);
        if let Err(e) = storage.read(plan.range, scratch) {
            shared.metrics.record_storage_fault();
            warn!(
                start = plan.range.start,
                end = plan.range.end,
                "fill read failed: {}",
                e
            );
            return false;
        }
        shared.metrics.record_read(plan.range.len() as u64);

        let accepted = {
            let mut state = shared.state.lock();
            state.overlay_parked(plan.range, scratch);
            let pinned = state.pinned();
            state
                .window
                .publish(plan.epoch, plan.range.start, scratch, &pinned)
        };
        shared.progress.notify_all();

        if accepted == 0 {
            return true;
        }
        shared.metrics.record_fill();
        shared.fill_requested.store(false, Ordering::Release);
    }
}
