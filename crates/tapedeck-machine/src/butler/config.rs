//! Tape machine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tapedeck_core::Error;

/// Window size, fill sizes and butler timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeConfig {
    /// Frame window capacity in frames (default: 262144 = 2^18)
    pub window_frames: usize,
    /// Low-water mark on either side of the play point (default: 2048)
    pub min_read_frames: usize,
    /// Frames per storage read during a fill (default: 16384)
    pub chunk_frames: usize,
    /// Sample rate, only used for presenting positions (default: 44100)
    pub sample_rate: f64,
    /// Butler wake-up interval without messages, in ms (default: 20)
    pub idle_poll_ms: u64,
    /// Back-off after a storage fault, in ms (default: 50)
    pub retry_ms: u64,
}

impl Default for TapeConfig {
    fn default() -> Self {
        Self {
            window_frames: 1 << 18,
            min_read_frames: 2048,
            chunk_frames: 16384,
            sample_rate: 44100.0,
            idle_poll_ms: 20,
            retry_ms: 50,
        }
    }
}

impl TapeConfig {
    /// Config with a custom window size; fill chunks shrink to fit.
    pub fn with_window_frames(frames: usize) -> Self {
        let defaults = Self::default();
        let chunk_frames = defaults.chunk_frames.min(frames / 4).max(1);
        Self {
            window_frames: frames,
            chunk_frames,
            min_read_frames: defaults.min_read_frames.min(chunk_frames),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.min_read_frames == 0 {
            return Err(Error::InvalidConfig("min_read_frames must be > 0".into()));
        }
        if self.chunk_frames < self.min_read_frames {
            return Err(Error::InvalidConfig(format!(
                "chunk_frames ({}) must be >= min_read_frames ({})",
                self.chunk_frames, self.min_read_frames
            )));
        }
        if self.window_frames < 4 * self.chunk_frames {
            return Err(Error::InvalidConfig(format!(
                "window_frames ({}) must hold at least 4 chunks of {}",
                self.window_frames, self.chunk_frames
            )));
        }
        if self.sample_rate.is_nan() || self.sample_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Frames the butler keeps filled at and after the play point.
    pub fn target_ahead(&self) -> usize {
        self.window_frames / 2
    }

    /// Frames the butler keeps filled before the play point.
    ///
    /// One chunk short of half the window, so a fill ahead never has to evict
    /// what a fill behind just loaded.
    pub fn target_behind(&self) -> usize {
        self.window_frames / 2 - self.chunk_frames
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }
}
