//! Transfer API integration tests
//!
//! Writes and reads through the frame window: round trips in both directions,
//! silence outside recorded slices, punch-in recording, overflow reporting.

use crate::helpers::*;
use tapedeck::prelude::*;
use tapedeck::Frame;

/// Data written with `write_fw` at `p` reads back unchanged from `p - n`.
#[test]
fn test_write_fw_read_fw_round_trip() {
    let tape = test_machine();
    let data = generate_sine(440.0, 44100.0, 1024);

    tape.go_to(2048);
    let mut slice = Slice::empty_at(2048);
    assert_eq!(tape.write_fw(&data, 0, &mut slice), 0);
    assert_eq!(slice, Slice::new(1024, 2048));
    assert_eq!(tape.position(), 2048, "writes must not move the play point");

    tape.go_to(2048 - data.len() as TapeTime);
    assert!(tape.wait_for_fill(WAIT));
    assert_signals_equal(&tape.read_fw(data.len(), 0), &data);
    assert_eq!(tape.position(), 2048);
}

#[test]
fn test_write_bw_read_bw_round_trip() {
    let tape = test_machine();
    // Playback order while travelling backwards from 600.
    let played = generate_integer_staircase(0, 100);

    tape.go_to(500);
    let mut slice = Slice::empty_at(500);
    assert_eq!(tape.write_bw(&played, 3, &mut slice), 0);
    assert_eq!(slice, Slice::new(500, 600));

    tape.go_to(600);
    assert_signals_equal(&tape.read_bw(100, 3), &played);
    assert_eq!(tape.position(), 500);

    // Forward playback sees the block reversed.
    let mut forward = tape.read_fw(100, 3);
    forward.reverse();
    assert_signals_equal(&forward, &played);
}

#[test]
fn test_silence_outside_slice() {
    let tape = test_machine();
    let data = generate_noise(256, 7);

    tape.go_to(1256);
    let mut slice = Slice::empty_at(1256);
    tape.write_fw(&data, 1, &mut slice);

    // Unrecord the middle; the window still holds the samples there.
    assert!(tape.cut(1, 1100));
    assert!(tape.cut(1, 1200));
    assert!(tape.erase(1, Slice::new(1100, 1200)));

    tape.go_to(1000);
    let read = tape.read_fw(256, 1);
    assert_signals_equal(&read[..100], &data[..100]);
    assert_silence(&read[100..200]);
    assert_signals_equal(&read[200..], &data[200..]);

    // Other tracks were never recorded.
    tape.go_to(1000);
    assert_silence(&tape.read_fw(256, 0));
}

#[test]
fn test_read_all_frames() {
    let tape = test_machine();
    tape.go_to(64);
    for track in 0..NUM_TRACKS {
        let mut slice = Slice::empty_at(64);
        let data = vec![track as f32 + 1.0; 64];
        tape.write_fw(&data, track, &mut slice);
    }
    tape.erase(2, Slice::new(0, 64));

    tape.go_to(0);
    let frames: Vec<Frame> = tape.read_all_fw(64);
    assert!(frames.iter().all(|f| *f == [1.0, 2.0, 0.0, 4.0]));
    assert_eq!(tape.position(), 64);

    let frames = tape.read_all_bw(64);
    assert!(frames.iter().all(|f| *f == [1.0, 2.0, 0.0, 4.0]));
    assert_eq!(tape.position(), 0);
}

/// Recording block by block behind the play point, as an audio callback would.
#[test]
fn test_punch_in_recording_session() {
    let tape = test_machine();
    let take = generate_integer_staircase(0, 512);

    tape.go_to(1000);
    tape.punch_in(2);
    let mut input = [0.0; 128];
    for block in take.chunks(128) {
        tape.read_fw_into(&mut input, 2);
        assert_eq!(tape.record_fw(block, 2), 0);
    }
    assert_eq!(tape.punch_out(2), Some(Slice::new(1000, 1512)));

    // Not punched in any more: nothing is recorded.
    tape.read_fw_into(&mut input, 2);
    assert_eq!(tape.record_fw(&input, 2), input.len());
    assert_eq!(tape.slices(2), vec![Slice::new(1000, 1512)]);

    tape.go_to(1000);
    assert_signals_equal(&tape.read_fw(512, 2), &take);
}

#[test]
fn test_punch_in_recording_backwards() {
    let tape = test_machine();
    tape.go_to(3000);
    tape.punch_in(0);

    let mut input = [0.0; 100];
    tape.read_bw_into(&mut input, 0);
    assert_eq!(tape.record_bw(&[0.5; 100], 0), 0);
    assert_eq!(tape.punch_out(0), Some(Slice::new(2900, 3000)));
}

#[test]
fn test_overflow_reported_as_unwritten() {
    let tape = test_machine();
    tape.shutdown();

    let ahead = tape.valid_ahead() as TapeTime;
    tape.go_to(ahead + 100);
    let mut slice = Slice::empty_at(0);
    let unwritten = tape.write_fw(&[1.0; 300], 0, &mut slice);

    assert_eq!(unwritten, 100);
    assert_eq!(slice, Slice::new(ahead - 200, ahead));
    assert_eq!(tape.metrics().overflow_frames, 100);
}

#[test]
fn test_time_string_follows_play_point() {
    let tape = test_machine();
    assert_eq!(tape.time_string(), "00:00.00");
    tape.go_to(-44100);
    assert_eq!(tape.time_string(), "-00:01.00");
}
