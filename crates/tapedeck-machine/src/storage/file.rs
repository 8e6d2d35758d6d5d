//! Tape stored as raw sample files in a directory.
//!
//! Layout per track: `track<N>.raw` holds little-endian `f32` samples for
//! positions `0..`, and `track<N>.pre.raw` holds positions before zero,
//! mirrored so that position `-1` is its first sample. `slices.json` holds the
//! slice map of every track. Positions whose byte offset does not fit a file
//! are [`Error::OutOfRange`].

use super::{check_len, TapeStorage};
use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tapedeck_core::{check_track, Frame, Sample, Slice, NUM_TRACKS};

const SAMPLE_BYTES: u64 = std::mem::size_of::<Sample>() as u64;
const SLICES_FILE: &str = "slices.json";

struct TrackFiles {
    /// Positions `0..`, in order.
    ahead: File,
    /// Positions `..0`, mirrored: sample `i` is position `-1 - i`.
    behind: File,
}

/// Split `range` into the part before zero and the part at or after it.
fn split_at_zero(range: Slice) -> (Option<Slice>, Option<Slice>) {
    let behind = (range.start < 0).then(|| Slice::new(range.start, range.end.min(0)));
    let ahead = (range.end > 0).then(|| Slice::new(range.start.max(0), range.end));
    (behind, ahead)
}

/// Byte offset of sample `index`, or `OutOfRange` for `range` if it overflows.
fn byte_offset(index: u64, range: Slice) -> Result<u64> {
    index.checked_mul(SAMPLE_BYTES).ok_or(Error::OutOfRange {
        start: range.start,
        end: range.end,
    })
}

/// Read `out.len()` samples starting at sample `first`; past the end is silence.
fn read_run(
    file: &mut File,
    bytes: &mut Vec<u8>,
    first: u64,
    out: &mut [Sample],
) -> Result<()> {
    let stored = file.metadata()?.len() / SAMPLE_BYTES;
    let available = stored.saturating_sub(first).min(out.len() as u64) as usize;
    if available == 0 {
        return Ok(());
    }

    bytes.resize(available * SAMPLE_BYTES as usize, 0);
    file.seek(SeekFrom::Start(first * SAMPLE_BYTES))?;
    file.read_exact(bytes)?;
    for (sample, raw) in out.iter_mut().zip(bytes.chunks_exact(SAMPLE_BYTES as usize)) {
        *sample = Sample::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    }
    Ok(())
}

fn write_run(
    file: &mut File,
    bytes: &mut Vec<u8>,
    offset: u64,
    samples: &[Sample],
) -> Result<()> {
    bytes.clear();
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    Ok(())
}

pub struct FileStorage {
    dir: PathBuf,
    tracks: Vec<TrackFiles>,
    slices: [Vec<Slice>; NUM_TRACKS],
    scratch: Vec<u8>,
    track_scratch: Vec<Sample>,
}

impl FileStorage {
    /// Open (or create) a tape directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let open = |name: String| {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(dir.join(name))
        };
        let tracks = (0..NUM_TRACKS)
            .map(|track| -> std::io::Result<TrackFiles> {
                Ok(TrackFiles {
                    ahead: open(format!("track{}.raw", track))?,
                    behind: open(format!("track{}.pre.raw", track))?,
                })
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        let slices_path = dir.join(SLICES_FILE);
        let slices: [Vec<Slice>; NUM_TRACKS] = if slices_path.exists() {
            serde_json::from_reader(File::open(&slices_path)?)?
        } else {
            Default::default()
        };

        Ok(Self {
            dir,
            tracks,
            slices,
            scratch: Vec::new(),
            track_scratch: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn save_slices(&self) -> Result<()> {
        let tmp = self.dir.join(format!("{}.tmp", SLICES_FILE));
        serde_json::to_writer_pretty(File::create(&tmp)?, &self.slices)?;
        fs::rename(&tmp, self.dir.join(SLICES_FILE))?;
        Ok(())
    }

    fn read_into(&mut self, track: usize, range: Slice, out: &mut [Sample]) -> Result<()> {
        out.fill(0.0);
        let files = &mut self.tracks[track];
        let (behind, ahead) = split_at_zero(range);

        if let Some(part) = ahead {
            let offset = (part.start - range.start) as usize;
            let dst = &mut out[offset..offset + part.len()];
            byte_offset(part.end as u64, range)?;
            read_run(&mut files.ahead, &mut self.scratch, part.start as u64, dst)?;
        }
        if let Some(part) = behind {
            let dst = &mut out[..part.len()];
            byte_offset(part.start.unsigned_abs(), range)?;
            // The run starts at the position nearest zero.
            read_run(&mut files.behind, &mut self.scratch, part.end.unsigned_abs(), dst)?;
            dst.reverse();
        }
        Ok(())
    }
}

impl TapeStorage for FileStorage {
    fn read(&mut self, range: Slice, out: &mut [Frame]) -> Result<()> {
        check_len(range, out.len())?;
        let mut samples = std::mem::take(&mut self.track_scratch);
        samples.resize(range.len(), 0.0);
        let mut result = Ok(());
        for track in 0..NUM_TRACKS {
            result = self.read_into(track, range, &mut samples);
            if result.is_err() {
                break;
            }
            for (frame, &sample) in out.iter_mut().zip(&samples) {
                frame[track] = sample;
            }
        }
        self.track_scratch = samples;
        result
    }

    fn read_track(&mut self, track: usize, range: Slice, out: &mut [Sample]) -> Result<()> {
        check_track(track)?;
        check_len(range, out.len())?;
        self.read_into(track, range, out)
    }

    fn write(&mut self, track: usize, range: Slice, samples: &[Sample]) -> Result<()> {
        check_track(track)?;
        check_len(range, samples.len())?;
        let (behind, ahead) = split_at_zero(range);
        let files = &mut self.tracks[track];

        if let Some(part) = ahead {
            let offset = (part.start - range.start) as usize;
            byte_offset(part.end as u64, range)?;
            let at = byte_offset(part.start as u64, range)?;
            write_run(
                &mut files.ahead,
                &mut self.scratch,
                at,
                &samples[offset..offset + part.len()],
            )?;
        }
        if let Some(part) = behind {
            byte_offset(part.start.unsigned_abs(), range)?;
            let at = byte_offset(part.end.unsigned_abs(), range)?;
            let mirrored: Vec<Sample> = samples[..part.len()].iter().rev().copied().collect();
            write_run(&mut files.behind, &mut self.scratch, at, &mirrored)?;
        }
        Ok(())
    }

    fn load_slices(&mut self, track: usize) -> Result<Vec<Slice>> {
        check_track(track)?;
        Ok(self.slices[track].clone())
    }

    fn store_slices(&mut self, track: usize, slices: &[Slice]) -> Result<()> {
        check_track(track)?;
        self.slices[track] = slices.to_vec();
        self.save_slices()
    }
}
