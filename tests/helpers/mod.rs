//! Test helpers and fixtures for tapedeck integration tests.
//!
//! Machines built here use a small window so that sliding, eviction and
//! relocation happen after a few thousand frames instead of a few hundred
//! thousand.

#![allow(dead_code)]

pub mod tolerances;

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::{Duration, Instant};
use tapedeck::prelude::*;

/// Window used by test machines (chunk 2048, low-water mark 2048).
pub const TEST_WINDOW: usize = 8192;

/// Upper bound for anything waiting on the butler.
pub const WAIT: Duration = Duration::from_secs(5);

/// Route butler logs to the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn test_config() -> TapeConfig {
    TapeConfig {
        idle_poll_ms: 5,
        retry_ms: 5,
        ..TapeConfig::with_window_frames(TEST_WINDOW)
    }
}

/// Machine over fresh in-memory storage, with its window filled.
pub fn test_machine() -> TapeMachine {
    test_machine_with(MemoryStorage::new())
}

/// Machine over `storage`, with its window filled.
pub fn test_machine_with(storage: impl TapeStorage) -> TapeMachine {
    init_tracing();
    let machine = TapeMachine::builder()
        .config(test_config())
        .storage(storage)
        .build()
        .expect("Failed to create test machine");
    assert!(machine.wait_for_fill(WAIT), "initial fill timed out");
    machine
}

/// Integer staircase `[start, start + 1, ...]` as samples.
///
/// Exact in f32 below 2^24, so every sample identifies its position.
pub fn generate_integer_staircase(start: usize, num_samples: usize) -> Vec<f32> {
    (start..start + num_samples).map(|i| i as f32).collect()
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Seeded noise in -1..1.
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_samples).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Assert that a signal is silent.
pub fn assert_silence(samples: &[f32]) {
    let max = peak(samples);
    assert!(
        max <= tolerances::SILENCE_THRESHOLD,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert two signals match sample for sample.
pub fn assert_signals_equal(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "signal lengths differ");
    for (a, e) in actual.iter().zip(expected) {
        approx::assert_abs_diff_eq!(*a, *e, epsilon = tolerances::FLOAT_EPSILON);
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
