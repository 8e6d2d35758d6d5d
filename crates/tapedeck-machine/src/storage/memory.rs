//! Sparse in-memory tape.

use super::{check_len, TapeStorage};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tapedeck_core::{check_track, Frame, Sample, Slice, TapeTime, NUM_TRACKS, SILENT_FRAME};

const CHUNK_FRAMES: TapeTime = 4096;

#[derive(Default)]
struct MemoryTape {
    /// chunk index -> CHUNK_FRAMES frames
    chunks: BTreeMap<TapeTime, Vec<Frame>>,
    slices: [Vec<Slice>; NUM_TRACKS],
    failing: bool,
    read_only: bool,
    latency: Duration,
}

impl MemoryTape {
    fn frame(&self, pos: TapeTime) -> Frame {
        self.chunks
            .get(&pos.div_euclid(CHUNK_FRAMES))
            .map(|chunk| chunk[pos.rem_euclid(CHUNK_FRAMES) as usize])
            .unwrap_or(SILENT_FRAME)
    }

    fn frame_mut(&mut self, pos: TapeTime) -> &mut Frame {
        let chunk = self
            .chunks
            .entry(pos.div_euclid(CHUNK_FRAMES))
            .or_insert_with(|| vec![SILENT_FRAME; CHUNK_FRAMES as usize]);
        &mut chunk[pos.rem_euclid(CHUNK_FRAMES) as usize]
    }
}

/// Tape kept entirely in memory.
///
/// Clones share the same tape, so a test can hand one clone to the machine and
/// inspect or sabotage the backend through another.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryTape>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    /// Make writes and slice-map stores fail while reads keep working, like a
    /// full disk or a read-only mount.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.lock().read_only = read_only;
    }

    /// Delay every subsequent operation by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.lock().latency = latency;
    }

    /// Samples of `track` over `range`.
    pub fn track_samples(&self, track: usize, range: Slice) -> Vec<Sample> {
        let tape = self.inner.lock();
        (range.start..range.end)
            .map(|pos| tape.frame(pos).get(track).copied().unwrap_or(0.0))
            .collect()
    }

    /// Overwrite `track` starting at `start`, bypassing faults and latency.
    pub fn put_track(&self, track: usize, start: TapeTime, samples: &[Sample]) {
        let mut tape = self.inner.lock();
        for (i, &sample) in samples.iter().enumerate() {
            if let Some(slot) = tape.frame_mut(start + i as TapeTime).get_mut(track) {
                *slot = sample;
            }
        }
    }

    /// Slice map last persisted for `track`.
    pub fn stored_slices(&self, track: usize) -> Vec<Slice> {
        self.inner
            .lock()
            .slices
            .get(track)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the persisted slice map of `track`.
    pub fn put_slices(&self, track: usize, slices: Vec<Slice>) {
        if let Some(stored) = self.inner.lock().slices.get_mut(track) {
            *stored = slices;
        }
    }

    fn begin(&self) -> Result<()> {
        let latency = {
            let tape = self.inner.lock();
            if tape.failing {
                return Err(Error::Storage("memory storage set to fail".into()));
            }
            tape.latency
        };
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        Ok(())
    }

    fn begin_write(&self) -> Result<()> {
        if self.inner.lock().read_only {
            return Err(Error::Storage("memory storage is read-only".into()));
        }
        self.begin()
    }
}

impl TapeStorage for MemoryStorage {
    fn read(&mut self, range: Slice, out: &mut [Frame]) -> Result<()> {
        check_len(range, out.len())?;
        self.begin()?;
        let tape = self.inner.lock();
        for (pos, frame) in (range.start..range.end).zip(out.iter_mut()) {
            *frame = tape.frame(pos);
        }
        Ok(())
    }

    fn read_track(&mut self, track: usize, range: Slice, out: &mut [Sample]) -> Result<()> {
        check_track(track)?;
        check_len(range, out.len())?;
        self.begin()?;
        let tape = self.inner.lock();
        for (pos, sample) in (range.start..range.end).zip(out.iter_mut()) {
            *sample = tape.frame(pos)[track];
        }
        Ok(())
    }

    fn write(&mut self, track: usize, range: Slice, samples: &[Sample]) -> Result<()> {
        check_track(track)?;
        check_len(range, samples.len())?;
        self.begin_write()?;
        let mut tape = self.inner.lock();
        for (pos, &sample) in (range.start..range.end).zip(samples) {
            tape.frame_mut(pos)[track] = sample;
        }
        Ok(())
    }

    fn load_slices(&mut self, track: usize) -> Result<Vec<Slice>> {
        check_track(track)?;
        self.begin()?;
        Ok(self.inner.lock().slices[track].clone())
    }

    fn store_slices(&mut self, track: usize, slices: &[Slice]) -> Result<()> {
        check_track(track)?;
        self.begin_write()?;
        self.inner.lock().slices[track] = slices.to_vec();
        Ok(())
    }
}
