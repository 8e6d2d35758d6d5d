//! The tape machine: real-time transfer API over the frame window.
//!
//! Every call here touches only the shared state lock, and only for as long
//! as it takes to copy frames in or out of the window. Storage is never
//! consulted; missing data reads as silence and is counted as an underrun.

use crate::butler::{ButlerThread, SharedTape, TapeConfig, TapeMetricsSnapshot, TapeState, Wake};
use crate::error::Result;
use crate::storage::{MemoryStorage, TapeStorage};
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tapedeck_core::{
    check_track, format_position, Frame, Sample, Slice, SliceSet, TapeTime, NUM_TRACKS,
    SILENT_FRAME,
};
use tracing::info;

const WAKE_CAPACITY: usize = 64;

/// Direction of travel along the tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Positions passed over when reading `len` frames from `play`.
    fn read_block(self, play: TapeTime, len: usize) -> Slice {
        match self {
            Direction::Forward => Slice::with_len(play, len),
            Direction::Backward => Slice::new(play - len as TapeTime, play),
        }
    }

    /// Positions just passed over when `len` frames end at `play`.
    fn write_block(self, play: TapeTime, len: usize) -> Slice {
        self.reverse().read_block(play, len)
    }

    fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Index of `pos` within `block`, counted in travel order.
    #[inline]
    fn index(self, block: Slice, pos: TapeTime) -> usize {
        match self {
            Direction::Forward => (pos - block.start) as usize,
            Direction::Backward => (block.end - 1 - pos) as usize,
        }
    }

    #[inline]
    fn delta(self, len: usize) -> TapeTime {
        match self {
            Direction::Forward => len as TapeTime,
            Direction::Backward => -(len as TapeTime),
        }
    }
}

#[inline]
fn covers(outer: Slice, inner: Slice) -> bool {
    outer.start <= inner.start && inner.end <= outer.end
}

/// Four-track tape machine backed by a [`TapeStorage`].
///
/// Create with [`TapeMachine::builder`]. All methods take `&self`; share the
/// machine between the audio callback and the control thread with an `Arc`.
pub struct TapeMachine {
    pub(crate) shared: Arc<SharedTape>,
    butler: Mutex<ButlerThread>,
    pub(crate) clipboard_gate: Mutex<()>,
}

impl TapeMachine {
    pub fn builder() -> TapeMachineBuilder {
        TapeMachineBuilder::default()
    }

    pub fn config(&self) -> &TapeConfig {
        &self.shared.config
    }

    // Reading

    /// Read `out.len()` samples of `track` forward from the play point.
    pub fn read_fw_into(&self, out: &mut [Sample], track: usize) {
        self.read_track(out, track, Direction::Forward);
    }

    /// Read `out.len()` samples of `track` backward from the play point,
    /// in travel (reverse) order.
    pub fn read_bw_into(&self, out: &mut [Sample], track: usize) {
        self.read_track(out, track, Direction::Backward);
    }

    pub fn read_fw(&self, frames: usize, track: usize) -> Vec<Sample> {
        let mut out = vec![0.0; frames];
        self.read_fw_into(&mut out, track);
        out
    }

    pub fn read_bw(&self, frames: usize, track: usize) -> Vec<Sample> {
        let mut out = vec![0.0; frames];
        self.read_bw_into(&mut out, track);
        out
    }

    pub fn read_all_fw_into(&self, out: &mut [Frame]) {
        self.read_frames(out, Direction::Forward);
    }

    pub fn read_all_bw_into(&self, out: &mut [Frame]) {
        self.read_frames(out, Direction::Backward);
    }

    pub fn read_all_fw(&self, frames: usize) -> Vec<Frame> {
        let mut out = vec![SILENT_FRAME; frames];
        self.read_all_fw_into(&mut out);
        out
    }

    pub fn read_all_bw(&self, frames: usize) -> Vec<Frame> {
        let mut out = vec![SILENT_FRAME; frames];
        self.read_all_bw_into(&mut out);
        out
    }

    fn read_track(&self, out: &mut [Sample], track: usize, dir: Direction) {
        out.fill(0.0);
        if out.is_empty() {
            return;
        }
        let mut state = self.shared.state.lock();
        let play = state.window.play();
        let block = dir.read_block(play, out.len());
        if let Some(index) = state.tracks.get(track) {
            for part in index.recorded_parts(block) {
                for pos in part.start..part.end {
                    if let Some(sample) = state.window.sample(pos, track) {
                        out[dir.index(block, pos)] = sample;
                    }
                }
            }
        }
        self.finish_read(&mut state, block, play + dir.delta(out.len()));
    }

    fn read_frames(&self, out: &mut [Frame], dir: Direction) {
        out.fill(SILENT_FRAME);
        if out.is_empty() {
            return;
        }
        let mut state = self.shared.state.lock();
        let play = state.window.play();
        let block = dir.read_block(play, out.len());
        for (track, index) in state.tracks.iter().enumerate() {
            for part in index.recorded_parts(block) {
                for pos in part.start..part.end {
                    if let Some(sample) = state.window.sample(pos, track) {
                        out[dir.index(block, pos)][track] = sample;
                    }
                }
            }
        }
        self.finish_read(&mut state, block, play + dir.delta(out.len()));
    }

    fn finish_read(&self, state: &mut TapeState, block: Slice, new_play: TapeTime) {
        if !covers(state.window.valid_span(), block) {
            self.shared.metrics.record_underrun();
        }
        self.shared.store_play(state, new_play);
        self.shared.check_low_water(state);
    }

    // Writing

    /// Write `data` to `track` so that its last sample lands at `position() - 1`.
    ///
    /// `slice` is grown to cover the written frames (merging with whatever
    /// it touches in the index) and updated to the stored slice. Returns the
    /// number of frames that fell outside the valid window and were dropped.
    pub fn write_fw(&self, data: &[Sample], track: usize, slice: &mut Slice) -> usize {
        let mut state = self.shared.state.lock();
        self.write_block(&mut state, data, track, slice, Direction::Forward)
    }

    /// Write `data`, given in reverse order, to `[position(), position() + len)`;
    /// its last sample lands at `position()`.
    pub fn write_bw(&self, data: &[Sample], track: usize, slice: &mut Slice) -> usize {
        let mut state = self.shared.state.lock();
        self.write_block(&mut state, data, track, slice, Direction::Backward)
    }

    /// [`write_fw`](Self::write_fw) into the punched-in region of `track`.
    ///
    /// Without an open punch-in nothing is written and the full length is
    /// returned.
    pub fn record_fw(&self, data: &[Sample], track: usize) -> usize {
        self.record(data, track, Direction::Forward)
    }

    pub fn record_bw(&self, data: &[Sample], track: usize) -> usize {
        self.record(data, track, Direction::Backward)
    }

    fn record(&self, data: &[Sample], track: usize, dir: Direction) -> usize {
        let mut state = self.shared.state.lock();
        let Some(mut region) = state.punch.get(track).copied().flatten() else {
            return data.len();
        };
        let unwritten = self.write_block(&mut state, data, track, &mut region, dir);
        state.punch[track] = Some(region);
        unwritten
    }

    fn write_block(
        &self,
        state: &mut TapeState,
        data: &[Sample],
        track: usize,
        slice: &mut Slice,
        dir: Direction,
    ) -> usize {
        if data.is_empty() {
            return 0;
        }
        if check_track(track).is_err() {
            return data.len();
        }

        let block = dir.write_block(state.window.play(), data.len());
        let Some(written) = block.intersect(&state.window.valid_span()) else {
            self.shared.metrics.record_overflow(data.len() as u64);
            return data.len();
        };
        for pos in written.start..written.end {
            state
                .window
                .write_sample(pos, track, data[dir.index(block, pos)]);
        }

        let first = state.mark_unflushed(track, written);
        // Only frames actually written become recorded.
        let grown = if slice.start <= slice.end && slice.touches(&written) {
            slice.union(&written)
        } else {
            written
        };
        if let Some(stored) = state.tracks[track].add_slice(grown) {
            *slice = stored;
        }

        let unwritten = data.len() - written.len();
        if unwritten > 0 {
            self.shared.metrics.record_overflow(unwritten as u64);
        }
        if first {
            self.shared.wake(Wake::Written);
        }
        unwritten
    }

    // Punch in / out

    /// Open a recordable region on `track` at the play point (`drop`).
    pub fn punch_in(&self, track: usize) {
        let mut state = self.shared.state.lock();
        let play = state.window.play();
        if let Some(region) = state.punch.get_mut(track) {
            *region = Some(Slice::empty_at(play));
        }
    }

    /// Close the open region on `track` (`lift`), returning it if anything
    /// was recorded.
    pub fn punch_out(&self, track: usize) -> Option<Slice> {
        let mut state = self.shared.state.lock();
        state.punch.get_mut(track)?.take().filter(Slice::is_valid)
    }

    pub fn is_punched_in(&self, track: usize) -> bool {
        matches!(self.shared.state.lock().punch.get(track), Some(Some(_)))
    }

    // Transport

    /// Move the play point. Outside the valid window this relocates the
    /// window; reads there are silent until the butler has refilled.
    pub fn go_to(&self, pos: TapeTime) {
        let mut state = self.shared.state.lock();
        self.shared.store_play(&mut state, pos);
        self.shared.check_low_water(&state);
    }

    pub fn move_by(&self, delta: TapeTime) {
        let mut state = self.shared.state.lock();
        let pos = state.window.play() + delta;
        self.shared.store_play(&mut state, pos);
        self.shared.check_low_water(&state);
    }

    /// Current play point, without locking.
    #[inline]
    pub fn position(&self) -> TapeTime {
        self.shared.play_point()
    }

    /// Play point as `MM:SS.ss`.
    pub fn time_string(&self) -> String {
        format_position(self.position(), self.shared.config.sample_rate)
    }

    pub fn valid_ahead(&self) -> usize {
        self.shared.state.lock().window.valid_ahead()
    }

    pub fn valid_behind(&self) -> usize {
        self.shared.state.lock().window.valid_behind()
    }

    /// Block until at least `min_read_frames` are valid on both sides of the
    /// play point. Not for the real-time thread.
    pub fn wait_for_fill(&self, timeout: Duration) -> bool {
        let min = self.shared.config.min_read_frames;
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !state.is_filled(min) {
            self.shared.check_low_water(&state);
            if self.shared.progress.wait_until(&mut state, deadline).timed_out() {
                return state.is_filled(min);
            }
        }
        true
    }

    /// Block until every write and index edit made so far has reached
    /// storage. Not for the real-time thread.
    pub fn wait_for_flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        let target = state.passes + 1;
        while !(state.is_clean() && state.passes >= target) {
            self.shared.wake(Wake::Written);
            if self.shared.progress.wait_until(&mut state, deadline).timed_out() {
                return state.is_clean() && state.passes >= target;
            }
        }
        true
    }

    // Interval index

    pub fn slices(&self, track: usize) -> Vec<Slice> {
        self.with_index(track, SliceSet::to_vec).unwrap_or_default()
    }

    pub fn slices_in(&self, track: usize, area: Slice) -> Vec<Slice> {
        self.with_index(track, |set| set.slices_in(area))
            .unwrap_or_default()
    }

    pub fn in_slice(&self, track: usize, t: TapeTime) -> bool {
        self.with_index(track, |set| set.in_slice(t)).unwrap_or(false)
    }

    pub fn current_slice(&self, track: usize, t: TapeTime) -> Option<Slice> {
        self.with_index(track, |set| set.current(t)).flatten()
    }

    /// Mark `slice` as recorded, merging with what it touches.
    pub fn add_slice(&self, track: usize, slice: Slice) -> Option<Slice> {
        let stored = self
            .with_index_mut(track, |set| set.add_slice(slice))
            .flatten();
        if stored.is_some() {
            self.shared.wake(Wake::SlicesChanged);
        }
        stored
    }

    pub fn erase(&self, track: usize, slice: Slice) -> bool {
        let erased = self
            .with_index_mut(track, |set| set.erase(slice))
            .unwrap_or(false);
        if erased {
            self.shared.wake(Wake::SlicesChanged);
        }
        erased
    }

    pub fn cut(&self, track: usize, t: TapeTime) -> bool {
        let split = self
            .with_index_mut(track, |set| set.cut(t))
            .unwrap_or(false);
        if split {
            self.shared.wake(Wake::SlicesChanged);
        }
        split
    }

    pub fn glue(&self, track: usize, a: Slice, b: Slice) -> Option<Slice> {
        let joined = self.with_index_mut(track, |set| set.glue(a, b)).flatten();
        if joined.is_some() {
            self.shared.wake(Wake::SlicesChanged);
        }
        joined
    }

    fn with_index<R>(&self, track: usize, f: impl FnOnce(&SliceSet) -> R) -> Option<R> {
        self.shared.state.lock().tracks.get(track).map(f)
    }

    fn with_index_mut<R>(&self, track: usize, f: impl FnOnce(&mut SliceSet) -> R) -> Option<R> {
        self.shared.state.lock().tracks.get_mut(track).map(f)
    }

    // Health

    pub fn metrics(&self) -> TapeMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn has_storage_fault(&self) -> bool {
        self.shared.metrics.has_storage_fault()
    }

    pub fn clear_storage_fault(&self) {
        self.shared.metrics.clear_storage_fault();
    }

    pub fn is_running(&self) -> bool {
        self.butler.lock().is_running()
    }

    /// Stop the butler after a final flush. Further transfers are still safe
    /// but nothing reaches storage any more.
    pub fn shutdown(&self) {
        let mut butler = self.butler.lock();
        if butler.is_running() {
            butler.stop();
            info!("tape machine stopped");
        }
    }
}

impl std::fmt::Debug for TapeMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapeMachine")
            .field("position", &self.position())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TapeMachine`].
#[derive(Default)]
pub struct TapeMachineBuilder {
    config: TapeConfig,
    storage: Option<Box<dyn TapeStorage>>,
}

impl TapeMachineBuilder {
    pub fn config(mut self, config: TapeConfig) -> Self {
        self.config = config;
        self
    }

    /// Window size in frames; fill chunks and the low-water mark follow.
    pub fn window_frames(mut self, frames: usize) -> Self {
        self.config = TapeConfig {
            sample_rate: self.config.sample_rate,
            idle_poll_ms: self.config.idle_poll_ms,
            retry_ms: self.config.retry_ms,
            ..TapeConfig::with_window_frames(frames)
        };
        self
    }

    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Storage backend; defaults to an empty [`MemoryStorage`].
    pub fn storage(mut self, storage: impl TapeStorage) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    /// Validate the config, load the slice maps and start the butler.
    pub fn build(self) -> Result<TapeMachine> {
        self.config.validate()?;
        let mut storage = self
            .storage
            .unwrap_or_else(|| Box::new(MemoryStorage::new()));

        let mut tracks: [SliceSet; NUM_TRACKS] = Default::default();
        for (track, index) in tracks.iter_mut().enumerate() {
            *index = SliceSet::from_slices(storage.load_slices(track)?);
        }
        let recorded: usize = tracks.iter().map(SliceSet::len).sum();

        let (wake_tx, wake_rx) = bounded(WAKE_CAPACITY);
        let shared = Arc::new(SharedTape::new(self.config, tracks, wake_tx));
        let butler = ButlerThread::spawn(Arc::clone(&shared), wake_rx, storage)?;
        shared.request_fill();

        info!(
            window_frames = self.config.window_frames,
            slices = recorded,
            "tape machine started"
        );

        Ok(TapeMachine {
            shared,
            butler: Mutex::new(butler),
            clipboard_gate: Mutex::new(()),
        })
    }
}
