//! Fixed-capacity ring of sequence slots.
//!
//! The ring is the sole owner of the slots; everything else refers to a slot
//! by its absolute buffer index. Pushes land at the newest end and evict from
//! the oldest end once the ring is full ([`Ring::tamp`] hands the victim
//! back so the caller can repair whatever referenced it). Holes — slots
//! carrying [`NIHIL`] — take part in the ring order like any occupied
//! position until [`Ring::compact`] removes them.
//!
//! Slot indices are stable only until the next evicting tamp or the next
//! compact.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::identity::{Identity, NIHIL};

/// Index value marking the absence of a previous occurrence.
pub const NO_PREV: i32 = -1;

/// One position of the sequence: an identity plus a back-link to the
/// previous live occurrence of the same identity, or a hole.
///
/// A back-link larger than the slot's own index means the chain crossed the
/// ring seam exactly once between the two occurrences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    /// Identity held by this position; [`NIHIL`] marks a hole.
    pub id: Identity,
    /// Absolute index of the previous live occurrence of `id`, or [`NO_PREV`].
    pub prev: i32,
}

impl Slot {
    /// A hole: no identity, no back-link.
    pub const HOLE: Slot = Slot { id: NIHIL, prev: NO_PREV };

    /// First occurrence of `id` (no earlier occurrence to link to).
    pub fn first(id: Identity) -> Self {
        Slot { id, prev: NO_PREV }
    }

    /// Occurrence of `id` linked back to the occurrence at `prev`.
    pub fn linked(id: Identity, prev: u32) -> Self {
        Slot { id, prev: prev as i32 }
    }

    /// Whether this slot is a hole.
    #[inline]
    pub fn is_hole(&self) -> bool {
        self.id == NIHIL
    }
}

/// Fixed-capacity circular buffer of [`Slot`]s.
///
/// Backing storage is allocated once at construction and never grows.
pub struct Ring {
    slots: Box<[Slot]>,
    /// Absolute index of the oldest occupied position.
    head: usize,
    /// Number of occupied positions (live slots and holes alike).
    len: usize,
}

impl Ring {
    /// A ring with room for `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 1, "ring capacity must exceed one slot");
        Ring {
            slots: vec![Slot::HOLE; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Total slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupied positions, holes included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no position is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every position is occupied.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Absolute index of the newest occupied position.
    #[inline]
    pub fn last_loc(&self) -> Option<usize> {
        if self.len == 0 {
            None
        } else {
            Some((self.head + self.len - 1) % self.capacity())
        }
    }

    /// Whether absolute index `i` currently lies in the occupied window.
    pub fn holds(&self, i: usize) -> bool {
        if i >= self.capacity() {
            return false;
        }
        let offset = (i + self.capacity() - self.head) % self.capacity();
        offset < self.len
    }

    /// Append `slot` at the newest end.
    ///
    /// When the ring is full the oldest slot is evicted to make room.
    /// Returns the evicted slot (if any) and a copy of the slot that is the
    /// oldest after the append, so the caller can repair chains that
    /// referenced the vacated index. The evicted index always equals the
    /// index the new slot landed on.
    pub fn tamp(&mut self, slot: Slot) -> (Option<Slot>, Slot) {
        let capacity = self.capacity();
        if self.len == capacity {
            let evicted = self.slots[self.head];
            self.slots[self.head] = slot;
            self.head = (self.head + 1) % capacity;
            (Some(evicted), self.slots[self.head])
        } else {
            self.slots[(self.head + self.len) % capacity] = slot;
            self.len += 1;
            (None, self.slots[self.head])
        }
    }

    /// Remove and return the newest slot.
    pub fn pop(&mut self) -> Option<Slot> {
        let loc = self.last_loc()?;
        let slot = core::mem::replace(&mut self.slots[loc], Slot::HOLE);
        self.len -= 1;
        Some(slot)
    }

    /// Copy of the newest slot.
    #[inline]
    pub fn last(&self) -> Option<Slot> {
        self.last_loc().map(|loc| self.slots[loc])
    }

    /// Slot at absolute index `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Slot {
        debug_assert!(self.holds(i), "index {} outside the occupied window", i);
        self.slots[i]
    }

    /// Mutable access to the slot at absolute index `i`.
    #[inline]
    pub fn get_mut(&mut self, i: usize) -> &mut Slot {
        debug_assert!(self.holds(i), "index {} outside the occupied window", i);
        &mut self.slots[i]
    }

    /// Whether `j` is the position immediately after `i` in ring order.
    ///
    /// Holes count as ordinary positions here; nothing is skipped.
    #[inline]
    pub fn adjacent(&self, i: usize, j: usize) -> bool {
        (i + 1) % self.capacity() == j
    }

    /// Drop every hole, sliding live slots into a contiguous prefix in
    /// chronological order. Returns the number of holes removed.
    ///
    /// Back-links are NOT adjusted: every `prev` field is stale afterwards
    /// and the caller must rebuild the chains.
    pub fn compact(&mut self) -> usize {
        let live: Vec<Slot> = self.iter().map(|(_, s)| s).filter(|s| !s.is_hole()).collect();
        let removed = self.len - live.len();
        self.slots.fill(Slot::HOLE);
        for (i, slot) in live.iter().enumerate() {
            self.slots[i] = *slot;
        }
        self.head = 0;
        self.len = live.len();
        removed
    }

    /// Absolute index of the `k`-th occupied position, oldest-first.
    pub fn nth_loc(&self, k: usize) -> Option<usize> {
        if k >= self.len {
            return None;
        }
        Some((self.head + k) % self.capacity())
    }

    /// Iterate occupied positions oldest-first as `(absolute index, slot)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Slot)> + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |k| {
            let i = (self.head + k) % capacity;
            (i, self.slots[i])
        })
    }

    /// Forget every occupied position.
    pub fn clear(&mut self) {
        self.slots.fill(Slot::HOLE);
        self.head = 0;
        self.len = 0;
    }
}
