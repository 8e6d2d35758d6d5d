//! Clipboard integration tests
//!
//! Copy and move of recorded slices through the butler, including the
//! single-flight rule for concurrent staging.

use crate::helpers::*;
use std::sync::Arc;
use std::thread;
use tapedeck::prelude::*;
use tapedeck::TapeMachine as Tape;

fn tape_with_recording(track: usize, slice: Slice, data: &[f32]) -> (Tape, MemoryStorage) {
    let storage = MemoryStorage::new();
    storage.put_track(track, slice.start, data);
    storage.put_slices(track, vec![slice]);
    (test_machine_with(storage.clone()), storage)
}

/// Copy `[100,150)` of track 0 to track 1 at 500.
#[test]
fn test_copy_between_tracks() {
    let source = generate_noise(50, 1);
    let (tape, storage) = tape_with_recording(0, Slice::new(100, 150), &source);

    let stored = tape.copy_slice(0, Slice::new(100, 150), 1, 500).unwrap();
    assert_eq!(stored, Slice::new(500, 550));
    assert_eq!(tape.slices(1), vec![Slice::new(500, 550)]);
    assert_eq!(tape.slices(0), vec![Slice::new(100, 150)]);

    tape.go_to(500);
    assert_signals_equal(&tape.read_fw(50, 1), &source);
    assert_signals_equal(&storage.track_samples(1, stored), &source);

    assert!(tape.wait_for_flush(WAIT));
    assert_eq!(storage.stored_slices(1), vec![Slice::new(500, 550)]);
    assert_eq!(tape.metrics().clipboard_transfers, 1);
}

#[test]
fn test_copy_merges_with_abutting_destination() {
    let (tape, _storage) = tape_with_recording(0, Slice::new(0, 10), &[0.25; 10]);
    tape.add_slice(2, Slice::new(90, 100));

    let stored = tape.copy_slice(0, Slice::new(0, 10), 2, 100).unwrap();
    assert_eq!(stored, Slice::new(90, 110));
    assert_eq!(tape.slices(2), vec![Slice::new(90, 110)]);
}

/// Unrecorded parts of the source arrive as silence; a move erases only the
/// recorded parts it carried.
#[test]
fn test_move_partially_recorded_slice() {
    let data = generate_integer_staircase(1, 100);
    let (tape, storage) = tape_with_recording(3, Slice::new(0, 100), &data);
    // Leave [40, 60) unrecorded but with stale samples in storage.
    tape.cut(3, 40);
    tape.cut(3, 60);
    tape.erase(3, Slice::new(40, 60));

    let stored = tape.move_slice(3, Slice::new(20, 80), 0, 1000).unwrap();
    assert_eq!(stored, Slice::new(1000, 1060));
    assert_eq!(tape.slices(3), vec![Slice::new(0, 20), Slice::new(80, 100)]);

    let moved = storage.track_samples(0, stored);
    assert_signals_equal(&moved[..20], &data[20..40]);
    assert_silence(&moved[20..40]);
    assert_signals_equal(&moved[40..], &data[60..80]);
}

/// Transfers staged from several threads run one at a time and each
/// destination ends up with exactly its own copy.
#[test]
fn test_concurrent_staging_is_single_flight() {
    let source = generate_noise(64, 9);
    let (tape, storage) = tape_with_recording(0, Slice::new(0, 64), &source);
    let tape = Arc::new(tape);

    let workers: Vec<_> = (1..NUM_TRACKS)
        .map(|track| {
            let tape = Arc::clone(&tape);
            thread::spawn(move || {
                let to = 1000 * track as TapeTime;
                tape.copy_slice(0, Slice::new(0, 64), track, to)
            })
        })
        .collect();

    for (i, worker) in workers.into_iter().enumerate() {
        let track = i + 1;
        let stored = worker.join().unwrap().unwrap();
        assert_eq!(stored, Slice::with_len(1000 * track as TapeTime, 64));
        assert_eq!(tape.slices(track), vec![stored]);
        assert_signals_equal(&storage.track_samples(track, stored), &source);
    }
    assert_eq!(tape.metrics().clipboard_transfers, 3);
}

#[test]
fn test_ticket_blocks_next_stage() {
    let (tape, _storage) = tape_with_recording(0, Slice::new(0, 8), &[1.0; 8]);
    let tape = Arc::new(tape);

    let ticket = tape.stage_copy(0, Slice::new(0, 8), 1, 0).unwrap();
    let second = {
        let tape = Arc::clone(&tape);
        thread::spawn(move || tape.copy_slice(0, Slice::new(0, 8), 1, 8))
    };
    thread::sleep(std::time::Duration::from_millis(50));
    assert!(!second.is_finished());

    assert_eq!(ticket.wait().unwrap(), Slice::new(0, 8));
    assert_eq!(second.join().unwrap().unwrap(), Slice::new(0, 16));
}

#[test]
fn test_invalid_source_slice_is_an_error() {
    let tape = test_machine();
    let result = tape.copy_slice(0, Slice::new(10, 10), 1, 0);
    assert!(matches!(
        result,
        Err(tapedeck::machine::Error::Core(tapedeck::core::Error::InvalidSlice { .. }))
    ));
    assert!(tape.slices(1).is_empty());
}
