//! Tape health counters.
//!
//! Written from both the real-time caller (underruns, overflow) and the
//! butler (storage traffic, faults). All counters are relaxed atomics; the
//! storage fault flag is sticky until cleared by the caller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct TapeMetrics {
    /// Frames read from storage
    frames_read: AtomicU64,
    /// Samples written to storage
    samples_written: AtomicU64,
    read_ops: AtomicU64,
    write_ops: AtomicU64,
    /// Fills published into the window
    fills: AtomicU64,
    /// Real-time reads that hit invalid window positions
    underruns: AtomicU64,
    /// Frames rejected by writes outside the valid span
    overflow_frames: AtomicU64,
    relocations: AtomicU64,
    clipboard_transfers: AtomicU64,
    storage_faults: AtomicU64,
    storage_fault: AtomicBool,
}

impl TapeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_read(&self, frames: u64) {
        self.frames_read.fetch_add(frames, Ordering::Relaxed);
        self.read_ops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write(&self, samples: u64) {
        self.samples_written.fetch_add(samples, Ordering::Relaxed);
        self.write_ops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fill(&self) {
        self.fills.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_overflow(&self, frames: u64) {
        self.overflow_frames.fetch_add(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_relocation(&self) {
        self.relocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_clipboard_transfer(&self) {
        self.clipboard_transfers.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a storage fault and raise the sticky fault flag.
    pub fn record_storage_fault(&self) {
        self.storage_faults.fetch_add(1, Ordering::Relaxed);
        self.storage_fault.store(true, Ordering::Release);
    }

    #[inline]
    pub fn has_storage_fault(&self) -> bool {
        self.storage_fault.load(Ordering::Acquire)
    }

    pub fn clear_storage_fault(&self) {
        self.storage_fault.store(false, Ordering::Release);
    }

    pub fn snapshot(&self) -> TapeMetricsSnapshot {
        TapeMetricsSnapshot {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            read_ops: self.read_ops.load(Ordering::Relaxed),
            write_ops: self.write_ops.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            overflow_frames: self.overflow_frames.load(Ordering::Relaxed),
            relocations: self.relocations.load(Ordering::Relaxed),
            clipboard_transfers: self.clipboard_transfers.load(Ordering::Relaxed),
            storage_faults: self.storage_faults.load(Ordering::Relaxed),
            storage_fault: self.has_storage_fault(),
        }
    }
}

/// Point-in-time copy of [`TapeMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapeMetricsSnapshot {
    pub frames_read: u64,
    pub samples_written: u64,
    pub read_ops: u64,
    pub write_ops: u64,
    pub fills: u64,
    pub underruns: u64,
    pub overflow_frames: u64,
    pub relocations: u64,
    pub clipboard_transfers: u64,
    pub storage_faults: u64,
    pub storage_fault: bool,
}
