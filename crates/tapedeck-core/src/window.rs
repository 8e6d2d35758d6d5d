//! Frame window: fixed-capacity ring of frames over the tape timeline.
//!
//! The window maps absolute tape time onto ring slots with
//! `slot = wrap_index(pos - origin)`. Of the whole ring only the *valid span*
//! `[valid_start, valid_end)` holds frames that match storage; the play cursor
//! sits somewhere inside (or on the edge of) that span. Reading moves the
//! cursor and leaves the span where it is, so `valid_ahead` shrinks while
//! `valid_behind` grows. The butler extends the span on either edge with
//! [`FrameWindow::publish`], evicting frames from the opposite edge once the
//! span reaches the ring capacity.

use crate::{Frame, Sample, Slice, TapeTime, SILENT_FRAME};

/// Sign-correct ring index: always in `[0, capacity)`, also for negative `index`.
#[inline]
pub fn wrap_index(index: TapeTime, capacity: usize) -> usize {
    index.rem_euclid(capacity as TapeTime) as usize
}

pub struct FrameWindow {
    frames: Box<[Frame]>,
    /// Tape position mapped to slot 0.
    origin: TapeTime,
    play: TapeTime,
    valid: Slice,
    /// Bumped on every recenter so stale fills can be rejected.
    epoch: u64,
}

impl FrameWindow {
    /// Allocate a window of `capacity` silent frames centered on position 0.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: vec![SILENT_FRAME; capacity].into_boxed_slice(),
            origin: 0,
            play: 0,
            valid: Slice::empty_at(0),
            epoch: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn wrap_index(&self, index: TapeTime) -> usize {
        wrap_index(index, self.capacity())
    }

    /// Ring slot holding tape position `pos`.
    #[inline]
    pub fn slot(&self, pos: TapeTime) -> usize {
        self.wrap_index(pos - self.origin)
    }

    #[inline]
    pub fn origin(&self) -> TapeTime {
        self.origin
    }

    #[inline]
    pub fn play(&self) -> TapeTime {
        self.play
    }

    #[inline]
    pub fn play_index(&self) -> usize {
        self.slot(self.play)
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Positions currently backed by storage-consistent frames.
    #[inline]
    pub fn valid_span(&self) -> Slice {
        self.valid
    }

    /// Valid frames at and after the play cursor.
    #[inline]
    pub fn valid_ahead(&self) -> usize {
        if self.is_play_inside() {
            (self.valid.end - self.play) as usize
        } else {
            0
        }
    }

    /// Valid frames before the play cursor.
    #[inline]
    pub fn valid_behind(&self) -> usize {
        if self.is_play_inside() {
            (self.play - self.valid.start) as usize
        } else {
            0
        }
    }

    /// True while the play cursor lies within `[valid_start, valid_end]`.
    #[inline]
    pub fn is_play_inside(&self) -> bool {
        self.valid.start <= self.play && self.play <= self.valid.end
    }

    #[inline]
    pub fn contains(&self, pos: TapeTime) -> bool {
        self.valid.contains(pos)
    }

    pub fn frame(&self, pos: TapeTime) -> Option<&Frame> {
        self.contains(pos).then(|| &self.frames[self.slot(pos)])
    }

    pub fn frame_mut(&mut self, pos: TapeTime) -> Option<&mut Frame> {
        if self.contains(pos) {
            let slot = self.slot(pos);
            Some(&mut self.frames[slot])
        } else {
            None
        }
    }

    #[inline]
    pub fn sample(&self, pos: TapeTime, track: usize) -> Option<Sample> {
        self.frame(pos).and_then(|f| f.get(track).copied())
    }

    /// Store one sample. Returns false if `pos` is outside the valid span.
    #[inline]
    pub fn write_sample(&mut self, pos: TapeTime, track: usize, sample: Sample) -> bool {
        match self.frame_mut(pos).and_then(|f| f.get_mut(track)) {
            Some(slot) => {
                *slot = sample;
                true
            }
            None => false,
        }
    }

    pub fn set_play(&mut self, pos: TapeTime) {
        self.play = pos;
    }

    /// Move the play cursor by `delta` frames (negative moves backwards).
    pub fn advance(&mut self, delta: TapeTime) {
        self.play += delta;
    }

    /// Drop the whole valid span and re-anchor the ring at `pos`.
    pub fn recenter(&mut self, pos: TapeTime) {
        self.origin = pos;
        self.play = pos;
        self.valid = Slice::empty_at(pos);
        self.epoch += 1;
    }

    /// Append the samples of `track` over `range` to `out`.
    ///
    /// Positions outside the valid span contribute silence.
    pub fn copy_track(&self, range: Slice, track: usize, out: &mut Vec<Sample>) {
        out.extend(
            (range.start..range.end).map(|pos| self.sample(pos, track).unwrap_or(0.0)),
        );
    }

    /// Overwrite `track` over `range` with `samples`, skipping positions outside
    /// the valid span. Returns the number of samples stored.
    pub fn overwrite_track(&mut self, range: Slice, track: usize, samples: &[Sample]) -> usize {
        let mut stored = 0;
        for (pos, &sample) in (range.start..range.end).zip(samples) {
            if self.write_sample(pos, track, sample) {
                stored += 1;
            }
        }
        stored
    }

    /// Extend the valid span with `frames` starting at tape position `at`.
    ///
    /// `at` must continue the span on either edge (`at == valid_end` for a
    /// fill ahead, `at + frames.len() == valid_start` for a fill behind) and
    /// `epoch` must match the current epoch; anything else is a stale fill and
    /// is dropped. When the span would outgrow the ring, frames are evicted
    /// from the opposite edge, but never the play cursor or any position
    /// inside `pinned`. The fill is truncated to respect that.
    ///
    /// Returns the number of frames accepted.
    pub fn publish(&mut self, epoch: u64, at: TapeTime, frames: &[Frame], pinned: &[Slice]) -> usize {
        if epoch != self.epoch || frames.is_empty() {
            return 0;
        }
        let capacity = self.capacity() as TapeTime;
        let len = frames.len() as TapeTime;

        if at == self.valid.end {
            // Lowest start the span may shrink to without losing pinned data.
            let floor = pinned
                .iter()
                .filter_map(|p| p.intersect(&self.valid))
                .map(|p| p.start)
                .fold(self.play.min(self.valid.end), TapeTime::min);
            let accept = len.min(floor + capacity - at).max(0);
            for (i, frame) in frames[..accept as usize].iter().enumerate() {
                let slot = self.slot(at + i as TapeTime);
                self.frames[slot] = *frame;
            }
            let end = at + accept;
            self.valid = Slice::new(self.valid.start.max(end - capacity), end);
            accept as usize
        } else if at + len == self.valid.start {
            let ceiling = pinned
                .iter()
                .filter_map(|p| p.intersect(&self.valid))
                .map(|p| p.end)
                .fold(self.play.max(self.valid.start), TapeTime::max);
            let accept = len.min(self.valid.start - (ceiling - capacity)).max(0);
            let skip = (len - accept) as usize;
            let start = self.valid.start - accept;
            for (i, frame) in frames[skip..].iter().enumerate() {
                let slot = self.slot(start + i as TapeTime);
                self.frames[slot] = *frame;
            }
            self.valid = Slice::new(start, self.valid.end.min(start + capacity));
            accept as usize
        } else {
            0
        }
    }
}

impl core::fmt::Debug for FrameWindow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameWindow")
            .field("capacity", &self.capacity())
            .field("origin", &self.origin)
            .field("play", &self.play)
            .field("valid", &self.valid)
            .field("epoch", &self.epoch)
            .finish()
    }
}
