//! Per-track interval index of recorded regions.
//!
//! Slices are kept in a `BTreeMap` keyed by their start, so point and range
//! queries are `O(log n + k)`. Stored slices never overlap. Every mutation
//! that changes the index raises the `changed` flag, which the butler thread
//! consumes to persist the slice map.
//!
//! Operations that cannot apply (erasing a slice that is not stored, gluing
//! slices that are not adjacent) are silent no-ops and report `false`/`None`.

use crate::{Slice, TapeTime};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceSet {
    /// start -> end
    slices: BTreeMap<TapeTime, TapeTime>,
    changed: bool,
}

impl SliceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from stored slices without raising the changed flag.
    pub fn from_slices(slices: impl IntoIterator<Item = Slice>) -> Self {
        let mut set = Self::new();
        for slice in slices {
            set.add_slice(slice);
        }
        set.changed = false;
        set
    }

    /// All stored slices overlapping `area`, ordered by start.
    pub fn slices_in(&self, area: Slice) -> Vec<Slice> {
        let mut out = Vec::new();
        if !area.is_valid() {
            return out;
        }
        if let Some((&start, &end)) = self.slices.range(..area.start).next_back() {
            if end > area.start {
                out.push(Slice::new(start, end));
            }
        }
        out.extend(
            self.slices
                .range(area.start..area.end)
                .map(|(&start, &end)| Slice::new(start, end)),
        );
        out
    }

    /// The recorded parts of `area`: stored slices clipped to `area`.
    pub fn recorded_parts(&self, area: Slice) -> Vec<Slice> {
        self.slices_in(area)
            .into_iter()
            .filter_map(|s| s.intersect(&area))
            .collect()
    }

    #[inline]
    pub fn in_slice(&self, t: TapeTime) -> bool {
        self.current(t).is_some()
    }

    /// The stored slice containing `t`.
    pub fn current(&self, t: TapeTime) -> Option<Slice> {
        self.slices
            .range(..=t)
            .next_back()
            .map(|(&start, &end)| Slice::new(start, end))
            .filter(|s| s.contains(t))
    }

    /// Insert `slice`, merging it with every stored slice it overlaps or abuts.
    ///
    /// Returns the slice actually stored, or `None` if `slice` is invalid.
    pub fn add_slice(&mut self, slice: Slice) -> Option<Slice> {
        if !slice.is_valid() {
            return None;
        }

        let mut merged = slice;
        if let Some((&start, &end)) = self.slices.range(..slice.start).next_back() {
            if end >= slice.start {
                self.slices.remove(&start);
                merged = merged.union(&Slice::new(start, end));
            }
        }
        while let Some((&start, &end)) = self.slices.range(slice.start..=merged.end).next() {
            self.slices.remove(&start);
            merged = merged.union(&Slice::new(start, end));
        }

        self.slices.insert(merged.start, merged.end);
        self.changed = true;
        Some(merged)
    }

    /// Remove exactly `slice`. Partial matches are left alone.
    pub fn erase(&mut self, slice: Slice) -> bool {
        if self.slices.get(&slice.start) == Some(&slice.end) {
            self.slices.remove(&slice.start);
            self.changed = true;
            true
        } else {
            false
        }
    }

    /// Split the slice strictly containing `t` into `[start, t)` and `[t, end)`.
    pub fn cut(&mut self, t: TapeTime) -> bool {
        match self.current(t) {
            Some(slice) if slice.start < t => {
                self.slices.insert(slice.start, t);
                self.slices.insert(t, slice.end);
                self.changed = true;
                true
            }
            _ => false,
        }
    }

    /// Join two stored, adjacent slices into one. Argument order is free.
    pub fn glue(&mut self, a: Slice, b: Slice) -> Option<Slice> {
        let (first, second) = if a.start <= b.start { (a, b) } else { (b, a) };
        if first.end != second.start || !self.contains_exact(first) || !self.contains_exact(second)
        {
            return None;
        }
        self.slices.remove(&second.start);
        self.slices.insert(first.start, second.end);
        self.changed = true;
        Some(Slice::new(first.start, second.end))
    }

    /// True if exactly `slice` is stored.
    #[inline]
    pub fn contains_exact(&self, slice: Slice) -> bool {
        slice.is_valid() && self.slices.get(&slice.start) == Some(&slice.end)
    }

    pub fn clear(&mut self) {
        if !self.slices.is_empty() {
            self.slices.clear();
            self.changed = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Slice> + '_ {
        self.slices
            .iter()
            .map(|(&start, &end)| Slice::new(start, end))
    }

    pub fn to_vec(&self) -> Vec<Slice> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    #[inline]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Read and clear the changed flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}
