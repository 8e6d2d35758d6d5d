//! Streaming integration tests
//!
//! The butler keeping the window in step with the play point: sustained
//! playback across many window lengths, relocation after a jump, recovery
//! from storage faults and slow storage.

use crate::helpers::*;
use std::time::Duration;
use tapedeck::prelude::*;

const TAPE_LEN: usize = 10 * TEST_WINDOW;

fn recorded_staircase() -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.put_track(0, 0, &generate_integer_staircase(0, TAPE_LEN));
    storage.put_slices(0, vec![Slice::with_len(0, TAPE_LEN)]);
    storage
}

/// Sustained forward playback: every block is served from the window and the
/// low-water mark is restored between callbacks.
#[test]
fn test_sustained_forward_playback() {
    let tape = test_machine_with(recorded_staircase());
    let mut block = vec![0.0; 256];

    for n in 0..TAPE_LEN / 256 {
        tape.read_fw_into(&mut block, 0);
        let start = n * 256;
        assert_signals_equal(&block, &generate_integer_staircase(start, 256));
        assert!(tape.wait_for_fill(WAIT), "refill stalled at {}", start);
    }

    let metrics = tape.metrics();
    assert_eq!(metrics.underruns, 0);
    assert_eq!(metrics.relocations, 0);
    assert!(metrics.fills as usize > TAPE_LEN / tape.config().chunk_frames);
}

#[test]
fn test_sustained_backward_playback() {
    let tape = test_machine_with(recorded_staircase());
    tape.go_to(TAPE_LEN as TapeTime);
    assert!(tape.wait_for_fill(WAIT));
    let mut block = vec![0.0; 512];

    for n in 1..=TAPE_LEN / 512 / 2 {
        tape.read_bw_into(&mut block, 0);
        let mut expected = generate_integer_staircase(TAPE_LEN - n * 512, 512);
        expected.reverse();
        assert_signals_equal(&block, &expected);
        assert!(tape.wait_for_fill(WAIT));
    }
    assert_eq!(tape.metrics().underruns, 0);
}

/// Reads ahead of the refill are silent and counted, never blocking.
#[test]
fn test_underrun_reads_silence() {
    let storage = recorded_staircase();
    let tape = test_machine_with(storage.clone());
    tape.shutdown();

    let ahead = tape.valid_ahead();
    let read = tape.read_fw(ahead + 256, 0);
    assert_signals_equal(&read[..ahead], &generate_integer_staircase(0, ahead));
    assert_silence(&read[ahead..]);
    assert_eq!(tape.metrics().underruns, 1);
}

/// Jumping far away and back: recorded data is flushed before the window
/// moves and read back from storage on return.
#[test]
fn test_relocation_round_trip() {
    let storage = MemoryStorage::new();
    let tape = test_machine_with(storage.clone());
    let data = generate_noise(1000, 42);

    tape.go_to(1500);
    let mut slice = Slice::empty_at(1500);
    tape.write_fw(&data, 1, &mut slice);

    tape.go_to(50_000_000);
    assert!(tape.wait_for_fill(WAIT));
    assert_silence(&tape.read_fw(1000, 1));
    assert!(tape.metrics().relocations >= 1);
    assert_signals_equal(&storage.track_samples(1, slice), &data);

    tape.go_to(500);
    assert!(tape.wait_for_fill(WAIT));
    assert_signals_equal(&tape.read_fw(1000, 1), &data);
}

#[test]
fn test_move_by_relocates() {
    let tape = test_machine();
    tape.move_by(-(10 * TEST_WINDOW as TapeTime));
    assert_eq!(tape.position(), -(10 * TEST_WINDOW as TapeTime));
    assert!(tape.wait_for_fill(WAIT));
    assert!(tape.valid_behind() >= tape.config().min_read_frames);
    assert!(tape.valid_ahead() >= tape.config().min_read_frames);
}

/// A failing backend raises the sticky fault flag; the real-time side keeps
/// going on whatever is cached, and the butler recovers once storage does.
#[test]
fn test_storage_fault_is_sticky_and_recoverable() {
    let storage = recorded_staircase();
    let tape = test_machine_with(storage.clone());

    storage.set_failing(true);
    tape.go_to(5 * TEST_WINDOW as TapeTime);
    assert!(wait_until(WAIT, || tape.has_storage_fault()));
    assert!(!tape.wait_for_fill(Duration::from_millis(50)));
    assert_silence(&tape.read_fw(64, 0));

    storage.set_failing(false);
    tape.go_to(5 * TEST_WINDOW as TapeTime);
    assert!(tape.wait_for_fill(WAIT));
    tape.clear_storage_fault();
    assert!(!tape.has_storage_fault());
    assert!(tape.metrics().storage_faults > 0);

    let start = 5 * TEST_WINDOW;
    assert_signals_equal(&tape.read_fw(64, 0), &generate_integer_staircase(start, 64));
}

/// Failed write-back is retried; nothing recorded is lost.
#[test]
fn test_failed_flush_is_retried() {
    let storage = MemoryStorage::new();
    let tape = test_machine_with(storage.clone());
    storage.set_failing(true);

    tape.go_to(100);
    let mut slice = Slice::empty_at(100);
    tape.write_fw(&[0.5; 100], 0, &mut slice);
    assert!(wait_until(WAIT, || tape.has_storage_fault()));
    assert!(!tape.wait_for_flush(Duration::from_millis(50)));

    storage.set_failing(false);
    assert!(tape.wait_for_flush(WAIT));
    assert_eq!(storage.track_samples(0, slice), vec![0.5; 100]);
    assert_eq!(storage.stored_slices(0), vec![Slice::new(0, 100)]);
}

#[test]
fn test_slow_storage_still_fills() {
    let storage = recorded_staircase();
    storage.set_latency(Duration::from_millis(2));
    let tape = test_machine_with(storage);

    tape.go_to(3 * TEST_WINDOW as TapeTime);
    assert!(tape.wait_for_fill(WAIT));
    let start = 3 * TEST_WINDOW;
    assert_signals_equal(&tape.read_fw(128, 0), &generate_integer_staircase(start, 128));
}

/// Storage that refuses writes: the take stays audible, the window keeps
/// moving, and everything lands once storage accepts writes again.
#[test]
fn test_refused_writes_do_not_stall_playback() {
    let storage = recorded_staircase();
    let tape = test_machine_with(storage.clone());
    assert!(tape.wait_for_fill(WAIT));
    storage.set_read_only(true);

    tape.go_to(600);
    let take = generate_noise(100, 3);
    let mut slice = Slice::empty_at(600);
    assert_eq!(tape.write_fw(&take, 1, &mut slice), 0);
    assert!(wait_until(WAIT, || tape.has_storage_fault()));

    tape.go_to(6 * TEST_WINDOW as TapeTime);
    assert!(tape.wait_for_fill(WAIT));
    let start = 6 * TEST_WINDOW;
    assert_signals_equal(&tape.read_fw(64, 0), &generate_integer_staircase(start, 64));

    tape.go_to(500);
    assert!(tape.wait_for_fill(WAIT));
    assert_signals_equal(&tape.read_fw(100, 1), &take);
    assert!(!tape.wait_for_flush(Duration::from_millis(50)));

    storage.set_read_only(false);
    assert!(tape.wait_for_flush(WAIT));
    assert_signals_equal(&storage.track_samples(1, slice), &take);
    assert_eq!(storage.stored_slices(1), vec![slice]);
}
