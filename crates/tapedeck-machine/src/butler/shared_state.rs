//! State shared between the real-time caller and the butler.
//!
//! Window metadata and all four slice indexes sit behind one mutex, so an
//! index edit and the window contents it refers to always change together.
//! The play point is mirrored into an atomic for lock-free position queries;
//! it is only ever stored while the mutex is held.

use super::config::TapeConfig;
use super::metrics::TapeMetrics;
use super::request::Wake;
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tapedeck_core::{Frame, FrameWindow, Sample, Slice, SliceSet, TapeTime, NUM_TRACKS};

/// Recorded samples on their way to storage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingWrite {
    pub track: usize,
    pub range: Slice,
    pub samples: Vec<Sample>,
}

impl PendingWrite {
    /// Samples of this write that fall inside `range`, with their positions.
    fn within(&self, range: Slice) -> impl Iterator<Item = (TapeTime, Sample)> + '_ {
        let overlap = self
            .range
            .intersect(&range)
            .unwrap_or(Slice::empty_at(range.start));
        (overlap.start..overlap.end)
            .map(move |pos| (pos, self.samples[(pos - self.range.start) as usize]))
    }
}

pub(crate) struct TapeState {
    pub window: FrameWindow,
    pub tracks: [SliceSet; NUM_TRACKS],
    /// Open punch-in region per track.
    pub punch: [Option<Slice>; NUM_TRACKS],
    /// Window positions written since the last flush, per track.
    pub unflushed: [Option<Slice>; NUM_TRACKS],
    /// Writes storage refused, oldest first. They no longer pin the window;
    /// fills and transfers read through them until a retry succeeds.
    pub parked: Vec<PendingWrite>,
    /// Completed butler passes (flush + slice-map save).
    pub passes: u64,
}

impl TapeState {
    pub fn new(window_frames: usize, tracks: [SliceSet; NUM_TRACKS]) -> Self {
        Self {
            window: FrameWindow::new(window_frames),
            tracks,
            punch: [None; NUM_TRACKS],
            unflushed: [None; NUM_TRACKS],
            parked: Vec::new(),
            passes: 0,
        }
    }

    /// Spans the window must not evict.
    pub fn pinned(&self) -> Vec<Slice> {
        self.unflushed.iter().flatten().copied().collect()
    }

    pub fn has_unflushed(&self) -> bool {
        self.unflushed.iter().any(Option::is_some)
    }

    pub fn has_changed_slices(&self) -> bool {
        self.tracks.iter().any(SliceSet::is_changed)
    }

    /// Grow the unflushed span of `track` to cover `written`.
    /// Returns true if the track had nothing pending before.
    pub fn mark_unflushed(&mut self, track: usize, written: Slice) -> bool {
        if let Some(span) = &mut self.unflushed[track] {
            *span = span.union(&written);
            false
        } else {
            self.unflushed[track] = Some(written);
            true
        }
    }

    /// Nothing is waiting to be written back.
    pub fn is_clean(&self) -> bool {
        !self.has_unflushed() && self.parked.is_empty() && !self.has_changed_slices()
    }

    /// Lay parked samples over frames just read from storage at `range`.
    pub fn overlay_parked(&self, range: Slice, frames: &mut [Frame]) {
        for write in &self.parked {
            for (pos, sample) in write.within(range) {
                frames[(pos - range.start) as usize][write.track] = sample;
            }
        }
    }

    /// Single-track variant of [`overlay_parked`](Self::overlay_parked).
    pub fn overlay_parked_track(&self, track: usize, range: Slice, out: &mut [Sample]) {
        for write in self.parked.iter().filter(|w| w.track == track) {
            for (pos, sample) in write.within(range) {
                out[(pos - range.start) as usize] = sample;
            }
        }
    }

    /// Both sides of the play point hold at least `min_frames` valid frames.
    pub fn is_filled(&self, min_frames: usize) -> bool {
        self.window.is_play_inside()
            && self.window.valid_ahead() >= min_frames
            && self.window.valid_behind() >= min_frames
    }
}

pub(crate) struct SharedTape {
    pub state: Mutex<TapeState>,
    /// Signalled by the butler whenever it publishes, flushes or relocates.
    pub progress: Condvar,
    pub play_point: AtomicI64,
    pub fill_requested: AtomicBool,
    pub shutdown: AtomicBool,
    pub metrics: TapeMetrics,
    pub config: TapeConfig,
    pub wake_tx: Sender<Wake>,
}

impl SharedTape {
    pub fn new(config: TapeConfig, tracks: [SliceSet; NUM_TRACKS], wake_tx: Sender<Wake>) -> Self {
        Self {
            state: Mutex::new(TapeState::new(config.window_frames, tracks)),
            progress: Condvar::new(),
            play_point: AtomicI64::new(0),
            fill_requested: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            metrics: TapeMetrics::new(),
            config,
            wake_tx,
        }
    }

    #[inline]
    pub fn play_point(&self) -> TapeTime {
        self.play_point.load(Ordering::Acquire)
    }

    /// Move the play cursor. Caller holds the state lock.
    #[inline]
    pub fn store_play(&self, state: &mut TapeState, pos: TapeTime) {
        state.window.set_play(pos);
        self.play_point.store(pos, Ordering::Release);
    }

    /// Non-blocking wake-up; a full channel means the butler is awake anyway.
    #[inline]
    pub fn wake(&self, reason: Wake) {
        let _ = self.wake_tx.try_send(reason);
    }

    /// Ask for a fill once until the butler has published one.
    #[inline]
    pub fn request_fill(&self) {
        if !self.fill_requested.swap(true, Ordering::AcqRel) {
            self.wake(Wake::LowWater);
        }
    }

    /// Wake the butler if either side of the play point is below the low-water mark.
    #[inline]
    pub fn check_low_water(&self, state: &TapeState) {
        if !state.window.is_play_inside() {
            self.wake(Wake::Relocate);
        } else if !state.is_filled(self.config.min_read_frames) {
            self.request_fill();
        }
    }

    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
