//! Occurrence index — a flat Robin-Hood map from identity to buffer location.
//!
//! Open addressing over a contiguous bucket array sized for the configured
//! capacity at an 80% load ceiling. No bucket ever heap-allocates and the
//! table never grows: when any probe displacement reaches
//! [`REHASH_DISPLACEMENT`] the table rehashes into itself, which purges
//! accumulated tombstones and restores short probes. Erasure tombstones a
//! bucket; a later insert of the same key recovers it in place.
//!
//! Keys are 24-bit identities; [`NIHIL`] is never a valid key (a zero key
//! marks a never-used bucket, which is what lets lookups stop early).

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::identity::{is_valid, Identity, NIHIL};

/// Probe displacement at which the table rehashes in place.
pub const REHASH_DISPLACEMENT: u8 = 7;

/// Location record for one identity resident in the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ref {
    /// Absolute buffer index of the newest live occurrence.
    pub last: u32,
    /// Number of live occurrences (at least 1 while the entry exists).
    pub card: u32,
}

impl Ref {
    /// Record for a first occurrence at `location`.
    pub fn first(location: u32) -> Self {
        Ref { last: location, card: 1 }
    }
}

/// Outcome of an index mutation. Any value but [`Note::Exhausted`] leaves
/// the table in a serviceable state; `Exhausted` means the capacity ceiling
/// was hit and nothing was inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Note {
    /// Not inserted: the capacity ceiling is reached.
    Exhausted,
    /// Inserted into a fresh bucket.
    Included,
    /// Erased.
    Excluded,
    /// Insert revived a tombstoned bucket of the same key.
    Recovered,
    /// Key already present; its value was replaced.
    Contained,
    /// Nothing to erase under that key.
    NotFound,
    /// Erase on an empty table.
    Empty,
}

impl Note {
    /// Stable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Note::Exhausted => "EXHAUSTED",
            Note::Included => "INCLUDED",
            Note::Excluded => "EXCLUDED",
            Note::Recovered => "RECOVERED",
            Note::Contained => "CONTAINED",
            Note::NotFound => "NOT_FOUND",
            Note::Empty => "EMPTY",
        }
    }
}

/// One bucket: key, probe displacement, tombstone flag, payload.
#[derive(Clone, Copy, Debug)]
struct Bucket {
    key: Identity,
    /// Distance from the key's home position (Robin-Hood displacement).
    dib: u8,
    /// Tombstone: the bucket still occupies its probe run but holds nothing.
    del: bool,
    val: Ref,
}

impl Bucket {
    const EMPTY: Bucket = Bucket {
        key: NIHIL,
        dib: 0,
        del: false,
        val: Ref { last: 0, card: 0 },
    };

    #[inline]
    fn live(&self) -> bool {
        self.key != NIHIL && !self.del
    }
}

/// Flat open-addressed Robin-Hood map `Identity -> Ref`.
pub struct OccurrenceIndex {
    buckets: Box<[Bucket]>,
    /// Live entries.
    cardinal: u32,
    /// Ceiling on live entries (80% of the bucket space).
    capacity: u32,
}

impl OccurrenceIndex {
    /// A table accepting up to `capacity` live entries.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "index capacity must be positive");
        let space = capacity * 100 / 80;
        OccurrenceIndex {
            buckets: vec![Bucket::EMPTY; space].into_boxed_slice(),
            cardinal: 0,
            capacity: capacity as u32,
        }
    }

    /// Live entry count.
    #[inline]
    pub fn len(&self) -> u32 {
        self.cardinal
    }

    /// Whether no entry is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinal == 0
    }

    /// Ceiling on live entries.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Insert `val` under `key`, replacing any present value.
    pub fn insert(&mut self, key: Identity, val: Ref) -> Note {
        self.insert_at(key, val, 0)
    }

    fn insert_at(&mut self, key: Identity, val: Ref, depth: u32) -> Note {
        debug_assert!(is_valid(key));
        if self.cardinal >= self.capacity {
            return Note::Exhausted;
        }
        let space = self.buckets.len();
        let mut entry = Bucket { key, dib: 0, del: false, val };
        let mut c = (key as usize) % space;
        loop {
            let bucket = &mut self.buckets[c];
            if bucket.key == NIHIL {
                *bucket = entry;
                self.cardinal += 1;
                return Note::Included;
            }
            if bucket.key == entry.key {
                return if bucket.del {
                    bucket.del = false;
                    bucket.val = entry.val;
                    self.cardinal += 1;
                    Note::Recovered
                } else {
                    bucket.val = entry.val;
                    Note::Contained
                };
            }
            if bucket.dib < entry.dib {
                // The resident is closer to home than the incomer: swap, and
                // carry the rich resident further down the run.
                core::mem::swap(bucket, &mut entry);
            }
            if entry.dib >= REHASH_DISPLACEMENT {
                return self.rehash(entry, depth);
            }
            entry.dib += 1;
            c = (c + 1) % space;
        }
    }

    /// Rebuild the table into itself: live entries are lifted out, the
    /// buckets cleared, and everything reinserted (tombstones vanish).
    /// `pending` is the displaced entry that tripped the displacement cap.
    fn rehash(&mut self, pending: Bucket, depth: u32) -> Note {
        debug_assert!(depth < 2, "rehash did not converge");
        let live: Vec<Bucket> = self.buckets.iter().filter(|b| b.live()).copied().collect();
        self.clear();
        for bucket in live {
            let note = self.insert_at(bucket.key, bucket.val, depth + 1);
            debug_assert!(note != Note::Exhausted);
        }
        if pending.live() {
            return self.insert_at(pending.key, pending.val, depth + 1);
        }
        Note::Included
    }

    /// Bucket position of a live `key`, if present.
    fn position(&self, key: Identity) -> Option<usize> {
        if self.cardinal == 0 || key == NIHIL {
            return None;
        }
        let space = self.buckets.len();
        let start = (key as usize) % space;
        let mut c = start;
        loop {
            let bucket = &self.buckets[c];
            if bucket.key == key {
                return if bucket.del { None } else { Some(c) };
            }
            if bucket.key == NIHIL {
                // Inserts never step over a never-used bucket, so the probe
                // run for `key` ends here.
                return None;
            }
            c = (c + 1) % space;
            if c == start {
                return None;
            }
        }
    }

    /// Shared view of the record under `key`.
    pub fn get(&self, key: Identity) -> Option<&Ref> {
        self.position(key).map(|c| &self.buckets[c].val)
    }

    /// Mutable view of the record under `key`.
    pub fn get_mut(&mut self, key: Identity) -> Option<&mut Ref> {
        self.position(key).map(|c| &mut self.buckets[c].val)
    }

    /// Whether a live entry exists under `key`.
    pub fn contains(&self, key: Identity) -> bool {
        self.position(key).is_some()
    }

    /// Tombstone the entry under `key`.
    pub fn erase(&mut self, key: Identity) -> Note {
        if key == NIHIL {
            return Note::NotFound;
        }
        if self.cardinal == 0 {
            return Note::Empty;
        }
        match self.position(key) {
            Some(c) => {
                self.buckets[c].del = true;
                self.cardinal -= 1;
                Note::Excluded
            }
            None => Note::NotFound,
        }
    }

    /// Drop every entry, tombstones included.
    pub fn clear(&mut self) {
        self.buckets.fill(Bucket::EMPTY);
        self.cardinal = 0;
    }

    /// Iterate live entries in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (Identity, &Ref)> + '_ {
        self.buckets.iter().filter(|b| b.live()).map(|b| (b.key, &b.val))
    }
}
