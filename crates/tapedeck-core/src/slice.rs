//! Half-open intervals of tape time.

use crate::{Error, Result, TapeTime};
use serde::{Deserialize, Serialize};

/// A recorded region `[start, end)` on one track.
///
/// A slice with `start >= end` is invalid and is never stored in a
/// [`SliceSet`](crate::SliceSet). The empty slice `[t, t)` is still useful as
/// an open punch-in point that has not recorded anything yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slice {
    pub start: TapeTime,
    pub end: TapeTime,
}

impl Slice {
    #[inline]
    pub const fn new(start: TapeTime, end: TapeTime) -> Self {
        Self { start, end }
    }

    /// Validating constructor.
    pub fn try_new(start: TapeTime, end: TapeTime) -> Result<Self> {
        let slice = Self::new(start, end);
        if slice.is_valid() {
            Ok(slice)
        } else {
            Err(Error::InvalidSlice { start, end })
        }
    }

    /// Empty slice anchored at `at`.
    #[inline]
    pub const fn empty_at(at: TapeTime) -> Self {
        Self { start: at, end: at }
    }

    /// Slice of `len` frames beginning at `start`.
    #[inline]
    pub const fn with_len(start: TapeTime, len: usize) -> Self {
        Self {
            start,
            end: start + len as TapeTime,
        }
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Number of frames covered; zero for invalid slices.
    #[inline]
    pub fn len(&self) -> usize {
        if self.is_valid() {
            (self.end - self.start) as usize
        } else {
            0
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    #[inline]
    pub const fn contains(&self, t: TapeTime) -> bool {
        self.start <= t && t < self.end
    }

    /// True if the two slices share at least one position.
    #[inline]
    pub const fn overlaps(&self, other: &Slice) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if the slices overlap or one ends exactly where the other begins.
    #[inline]
    pub const fn touches(&self, other: &Slice) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest slice covering both.
    #[inline]
    pub fn union(&self, other: &Slice) -> Slice {
        Slice::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Shared part of both slices, if any.
    #[inline]
    pub fn intersect(&self, other: &Slice) -> Option<Slice> {
        let s = Slice::new(self.start.max(other.start), self.end.min(other.end));
        s.is_valid().then_some(s)
    }

    /// Same length, moved to begin at `start`.
    #[inline]
    pub fn moved_to(&self, start: TapeTime) -> Slice {
        Slice::new(start, start + (self.end - self.start))
    }
}

impl From<core::ops::Range<TapeTime>> for Slice {
    fn from(range: core::ops::Range<TapeTime>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<Slice> for core::ops::Range<TapeTime> {
    fn from(slice: Slice) -> Self {
        slice.start..slice.end
    }
}
