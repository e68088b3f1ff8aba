//! The compaction engine: a chronicle of identities folded online.
//!
//! [`Chronicle::incl`] feeds one identity into the sequence. After the push
//! the engine looks at the two freshest live elements and keeps folding:
//! a pair the storage already knows collapses immediately; an unknown pair
//! that repeats an earlier adjacent pair mints a fresh pattern, rewrites the
//! earlier occurrence in place (leaving a hole) and collapses the top. Every
//! fold shortens the sequence by two, so a single inclusion can cascade.
//!
//! State is a fixed-capacity [`Ring`] of slots plus an [`OccurrenceIndex`]
//! mapping every resident identity to its newest slot and live count. Each
//! slot back-links the previous occurrence of its identity, giving every
//! identity an intrusive newest-first chain threaded through the ring —
//! eviction, popping and substitution all repair these chains in place.
//!
//! # Invariants
//!
//! - Walking back-links from `Ref::last` visits exactly `Ref::card` live
//!   slots of that identity, newest first, ending at [`NO_PREV`].
//! - A back-link pointing at a larger index crossed the ring seam once.
//! - Holes carry [`NIHIL`], never link, and are never indexed; their exact
//!   count is `gap()`, and `len() == size() - gap()` at every return.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use hashbrown::HashMap;

use crate::identity::{is_valid, Identity, IDENTITY_LIMIT, NIHIL};
use crate::index::{Note, OccurrenceIndex, Ref};
use crate::ring::{Ring, Slot, NO_PREV};
use crate::store::PatternStore;

/// Smallest ring that leaves the fold machinery room to operate.
pub const MIN_CAPACITY: usize = 6;

/// Online stream-compaction engine over an injected pattern storage.
pub struct Chronicle<S: PatternStore> {
    store: S,
    /// The sequence tail: live slots and holes in ring order.
    seq: Ring,
    /// Identity to newest-occurrence location and live count.
    loc: OccurrenceIndex,
    /// Holes currently in the occupied window.
    holes: u32,
}

impl<S: PatternStore> Chronicle<S> {
    /// An empty chronicle holding up to `capacity` sequence positions.
    ///
    /// The occurrence index is sized for `capacity` distinct identities, the
    /// worst case. `capacity` must be at least [`MIN_CAPACITY`].
    pub fn new(capacity: usize, store: S) -> Self {
        assert!(capacity >= MIN_CAPACITY, "chronicle capacity too small");
        Chronicle {
            store,
            seq: Ring::new(capacity),
            loc: OccurrenceIndex::new(capacity),
            holes: 0,
        }
    }

    /// The injected pattern storage.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the injected pattern storage.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ── Statistics ───────────────────────────────────────────────────────

    /// Occupied positions, holes included.
    pub fn size(&self) -> u32 {
        self.seq.len() as u32
    }

    /// Live elements: `size() - gap()`.
    pub fn len(&self) -> u32 {
        self.size() - self.holes
    }

    /// Holes left behind by pattern substitution.
    pub fn gap(&self) -> u32 {
        self.holes
    }

    /// Distinct identities currently resident.
    pub fn distinct(&self) -> u32 {
        self.loc.len()
    }

    /// Whether nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Copy of the newest slot, if any.
    pub fn last(&self) -> Option<Slot> {
        self.seq.last()
    }

    /// Identity of the newest slot, [`NIHIL`] when empty.
    pub fn last_id(&self) -> Identity {
        self.seq.last().map_or(NIHIL, |slot| slot.id)
    }

    /// Whether `id` is resident at least once.
    pub fn contains(&self, id: Identity) -> bool {
        is_valid(id) && self.loc.contains(id)
    }

    /// Number of live occurrences of `id`.
    pub fn num(&self, id: Identity) -> u32 {
        if !is_valid(id) {
            return 0;
        }
        self.loc.get(id).map_or(0, |r| r.card)
    }

    // ── Inclusion ────────────────────────────────────────────────────────

    /// Feed one identity into the sequence.
    ///
    /// Returns `false` without touching any state when `id` is [`NIHIL`] or
    /// out of the 24-bit range, and when the occurrence index is exhausted
    /// (which is fatal to forward progress).
    pub fn incl(&mut self, id: Identity) -> bool {
        if !is_valid(id) {
            return false;
        }
        if self.seq.is_empty() {
            return self.push(id);
        }

        // The two freshest live elements drive the folding below.
        let mut pred = match self.seq.last() {
            Some(slot) => slot,
            None => return false,
        };
        debug_assert!(!pred.is_hole(), "newest slot is never a hole");
        if !self.push(id) {
            return false;
        }
        let mut succ = match self.seq.last() {
            Some(slot) => slot,
            None => return false,
        };

        loop {
            if pred.is_hole() {
                // A fold consumed everything beneath the pattern.
                break;
            }

            // A pair the storage already knows collapses immediately.
            let known = self.store.hunt(pred.id, succ.id);
            if known != NIHIL {
                match self.fold(known) {
                    Some((p, s)) => {
                        pred = p;
                        succ = s;
                        continue;
                    }
                    None => return false,
                }
            }

            if !self.store.sticky(pred.id, succ.id) {
                break;
            }

            if pred.id == succ.id {
                // Twin identities mint without hunting for an earlier pair.
                let pattern = self.store.make(succ.id, succ.id);
                debug_assert!(is_valid(pattern));
                debug_assert!(
                    !self.loc.contains(pattern),
                    "make returned a resident identity for a fresh pair"
                );
                match self.fold(pattern) {
                    Some((p, s)) => {
                        pred = p;
                        succ = s;
                    }
                    None => return false,
                }
                // Minted this instant: the folded top is its only occurrence.
                if let Some(r) = self.loc.get_mut(pattern) {
                    r.card = 1;
                }
                continue;
            }

            // Distinct pair: only worth minting if the same pair already
            // occurred adjacently somewhere earlier in the buffer.
            let (po, so) = match self.seek(pred.id, succ.id) {
                Some(found) => found,
                None => break,
            };
            let pattern = self.store.make(pred.id, succ.id);
            debug_assert!(is_valid(pattern));
            // Collapse the earlier pair in place: the predecessor occurrence
            // becomes a hole, the successor occurrence is rewritten into the
            // pattern's first occurrence.
            self.splice(pred.id, po, NIHIL);
            self.holes += 1;
            self.splice(succ.id, so, pattern);
            match self.fold(pattern) {
                Some((p, s)) => {
                    pred = p;
                    succ = s;
                }
                None => return false,
            }
            // Link the fresh top to the rewritten occurrence; the pattern is
            // now resident twice.
            if let Some(top) = self.seq.last_loc() {
                self.seq.get_mut(top).prev = so as i32;
            }
            if let Some(r) = self.loc.get_mut(pattern) {
                r.card = 2;
            }
        }
        true
    }

    // ── Push / pop with chain upkeep ─────────────────────────────────────

    /// Append `id` at the newest end, linking it into its occurrence chain
    /// and repairing whatever the eviction (if any) disturbed.
    fn push(&mut self, id: Identity) -> bool {
        debug_assert!(is_valid(id));
        let slot = match self.loc.get(id) {
            Some(r) => Slot::linked(id, r.last),
            None => Slot::first(id),
        };
        let (evicted, _oldest) = self.seq.tamp(slot);
        let landed = match self.seq.last_loc() {
            Some(i) => i as u32,
            None => return false,
        };
        if let Some(victim) = evicted {
            if victim.id == NIHIL {
                debug_assert!(self.holes > 0);
                self.holes -= 1;
            } else {
                self.repair_evicted(victim.id, landed);
            }
        }
        match self.loc.get_mut(id) {
            Some(r) => {
                r.last = landed;
                r.card += 1;
                true
            }
            None => {
                // First occurrence — or the eviction above removed the only
                // other one, in which case the captured back-link would point
                // at the slot itself and must go.
                self.seq.get_mut(landed as usize).prev = NO_PREV;
                self.loc.insert(id, Ref::first(landed)) != Note::Exhausted
            }
        }
    }

    /// Cut the evicted occurrence of `id` out of its chain. `term` is the
    /// vacated index (which the incoming slot just landed on).
    fn repair_evicted(&mut self, id: Identity, term: u32) {
        let r = match self.loc.get(id) {
            Some(r) => *r,
            None => {
                debug_assert!(false, "evicted identity missing from the index");
                return;
            }
        };
        debug_assert!(r.card > 0);
        if r.card == 1 {
            self.loc.erase(id);
            return;
        }
        // The evicted slot is the oldest occurrence: walk to the node whose
        // back-link reaches the vacated index and terminate the chain there.
        // When the evicted identity equals the pushed one, `r.last` is still
        // the pre-push newest occurrence, which is exactly where the
        // walkable chain starts.
        let mut node = r.last;
        loop {
            let link = self.seq.get(node as usize).prev;
            if link == term as i32 {
                self.seq.get_mut(node as usize).prev = NO_PREV;
                break;
            }
            debug_assert!(link >= 0, "evicted occurrence not reachable in its chain");
            node = link as u32;
        }
        if let Some(r) = self.loc.get_mut(id) {
            r.card -= 1;
        }
    }

    /// Remove the newest slot, shifting its identity's chain head back.
    fn pop(&mut self) -> Option<Slot> {
        let slot = self.seq.pop()?;
        if slot.id == NIHIL {
            debug_assert!(self.holes > 0);
            self.holes -= 1;
            return Some(slot);
        }
        match self.loc.get_mut(slot.id) {
            Some(r) if r.card > 1 => {
                debug_assert!(slot.prev >= 0);
                r.last = slot.prev as u32;
                r.card -= 1;
            }
            Some(_) => {
                self.loc.erase(slot.id);
            }
            None => debug_assert!(false, "popped identity missing from the index"),
        }
        Some(slot)
    }

    // ── Folding ──────────────────────────────────────────────────────────

    /// Replace the two newest live elements by `pattern`: pop them (and any
    /// holes a splice left just beneath), then push the pattern through the
    /// ordinary path so the index stays honest.
    ///
    /// Returns the new (predecessor, top) pair; the predecessor is the hole
    /// sentinel when the pattern is all that remains. `None` means the index
    /// refused the push.
    fn fold(&mut self, pattern: Identity) -> Option<(Slot, Slot)> {
        self.pop();
        loop {
            self.pop();
            match self.seq.last() {
                Some(slot) if slot.is_hole() => continue,
                _ => break,
            }
        }
        let pred = self.seq.last().unwrap_or(Slot::HOLE);
        if !self.push(pattern) {
            return None;
        }
        let succ = self.seq.last()?;
        Some((pred, succ))
    }

    /// Cut the occurrence of `id` at index `target` out of its chain and
    /// rewrite the slot to `replacement` (a hole when [`NIHIL`]).
    ///
    /// `target` is never the chain head: callers pass occurrences found by
    /// [`Chronicle::seek`], which skips the newest one. The chain head
    /// recorded in the index is left alone — the fold that follows pops it
    /// and rewrites the record before anything reads it again.
    fn splice(&mut self, id: Identity, target: u32, replacement: Identity) {
        let r = match self.loc.get(id) {
            Some(r) => *r,
            None => {
                debug_assert!(false, "spliced identity missing from the index");
                return;
            }
        };
        debug_assert!(r.card > 1);
        let mut node = r.last;
        let mut link = self.seq.get(node as usize).prev;
        while link != target as i32 {
            debug_assert!(link >= 0, "target occurrence not in its chain");
            node = link as u32;
            link = self.seq.get(node as usize).prev;
        }
        let after = self.seq.get(target as usize).prev;
        self.seq.get_mut(node as usize).prev = after;
        let slot = self.seq.get_mut(target as usize);
        slot.id = replacement;
        slot.prev = NO_PREV;
        if let Some(r) = self.loc.get_mut(id) {
            r.card -= 1;
        }
    }

    // ── Adjacency search ─────────────────────────────────────────────────

    /// Nearest earlier pair of occurrences `(p, s)` of `pred` and `succ`
    /// with `s` immediately following `p` in ring order.
    ///
    /// Walks both occurrence chains newest-to-oldest in lockstep, skipping
    /// the newest occurrence of each (that is the pair being matched).
    /// Positions are compared unwrapped: a back-link that jumps to a larger
    /// index crossed the seam, which shifts that chain's frame by the ring
    /// capacity. The side sitting further forward steps back first, so the
    /// walk is a plain merge in `O(card(pred) + card(succ))`.
    fn seek(&self, pred: Identity, succ: Identity) -> Option<(u32, u32)> {
        let capacity = self.seq.capacity() as i64;

        let rp = self.loc.get(pred)?;
        if rp.card < 2 {
            return None;
        }
        let rs = self.loc.get(succ)?;
        if rs.card < 2 {
            return None;
        }

        let mut p_shift: i64 = 0;
        let mut p = self.seq.get(rp.last as usize).prev;
        debug_assert!(p >= 0);
        if p > rp.last as i32 {
            p_shift = capacity;
        }

        let mut s_shift: i64 = 0;
        let mut s = self.seq.get(rs.last as usize).prev;
        debug_assert!(s >= 0);
        if s > rs.last as i32 {
            s_shift = capacity;
        }

        while p >= 0 && s >= 0 {
            if self.seq.adjacent(p as usize, s as usize) {
                return Some((p as u32, s as u32));
            }
            if (s as i64 - s_shift) > (p as i64 - p_shift) + 1 {
                // The successor occurrence is too fresh to ever pair with
                // this or any older predecessor position.
                let next = self.seq.get(s as usize).prev;
                if next > s {
                    debug_assert!(s_shift == 0, "chain wrapped twice");
                    s_shift = capacity;
                }
                s = next;
            } else {
                let next = self.seq.get(p as usize).prev;
                if next > p {
                    debug_assert!(p_shift == 0, "chain wrapped twice");
                    p_shift = capacity;
                }
                p = next;
            }
        }
        None
    }

    // ── Maintenance ──────────────────────────────────────────────────────

    /// Remove every hole and rebuild the occurrence index from scratch.
    /// Returns the number of holes eliminated.
    pub fn compact(&mut self) -> u32 {
        let removed = self.seq.compact() as u32;
        self.rebuild_index();
        removed
    }

    /// One oldest-first pass recreating chains and records: each live slot
    /// links back to the previously recorded newest occurrence of its id.
    fn rebuild_index(&mut self) {
        self.loc.clear();
        self.holes = 0;
        for k in 0..self.seq.len() {
            let i = match self.seq.nth_loc(k) {
                Some(i) => i,
                None => break,
            };
            let id = self.seq.get(i).id;
            if id == NIHIL {
                self.holes += 1;
                continue;
            }
            match self.loc.get_mut(id) {
                Some(r) => {
                    self.seq.get_mut(i).prev = r.last as i32;
                    r.last = i as u32;
                    r.card += 1;
                }
                None => {
                    self.seq.get_mut(i).prev = NO_PREV;
                    self.loc.insert(id, Ref::first(i as u32));
                }
            }
        }
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.seq.clear();
        self.loc.clear();
        self.holes = 0;
    }

    // ── Inspection ───────────────────────────────────────────────────────

    /// Visit occupied positions oldest-first as `(slot, absolute index)`;
    /// the visitor returns `false` to stop early. Returns whether the walk
    /// ran to completion.
    pub fn process<F: FnMut(Slot, usize) -> bool>(&self, mut f: F) -> bool {
        for (i, slot) in self.seq.iter() {
            if !f(slot, i) {
                return false;
            }
        }
        true
    }

    /// Histogram of chain lengths: `(live occurrences, identities with that
    /// count)`, ascending.
    pub fn occurrence_histogram(&self) -> Vec<(u32, u32)> {
        let mut freq: HashMap<u32, u32> = HashMap::new();
        for (_, r) in self.loc.iter() {
            *freq.entry(r.card).or_insert(0) += 1;
        }
        let mut histogram: Vec<(u32, u32)> = freq.into_iter().collect();
        histogram.sort_unstable();
        histogram
    }

    /// Render the occupied window and the index, one line per position —
    /// for small sequences and debugging sessions only.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "chronicle: len {}, size {}, gap {}, distinct {}",
            self.len(),
            self.size(),
            self.gap(),
            self.distinct()
        );
        for (i, slot) in self.seq.iter() {
            if slot.is_hole() {
                let _ = writeln!(out, "{:>6} |", i);
            } else if slot.prev >= 0 {
                let _ = writeln!(
                    out,
                    "{:>6} | {:>6} <- #{:08} `{}`",
                    i,
                    slot.prev,
                    slot.id,
                    self.store.lex(slot.id)
                );
            } else {
                let _ = writeln!(out, "{:>6} |           #{:08} `{}`", i, slot.id, self.store.lex(slot.id));
            }
        }
        for (id, r) in self.loc.iter() {
            let _ = writeln!(
                out,
                "#{:08}  last {:>6}  card {:>5} | `{}`",
                id,
                r.last,
                r.card,
                self.store.lex(id)
            );
        }
        out
    }

    /// Full structural audit: chain walks, counts, link targets, hole
    /// accounting, uniqueness of chain heads. Intended for tests; cost is
    /// proportional to the occupied window plus all chain lengths.
    pub fn consistent(&self) -> bool {
        let mut errors = 0u32;
        let mut holes = 0u32;

        for (_, slot) in self.seq.iter() {
            if slot.is_hole() {
                holes += 1;
                if slot.prev != NO_PREV {
                    errors += 1;
                }
                continue;
            }
            if slot.id >= IDENTITY_LIMIT {
                errors += 1;
            }
            if !self.loc.contains(slot.id) {
                errors += 1;
            }
            if slot.prev >= 0 {
                let target = slot.prev as usize;
                if !self.seq.holds(target) || self.seq.get(target).id != slot.id {
                    errors += 1;
                }
            }
        }
        if holes != self.holes {
            errors += 1;
        }

        let mut heads: Vec<u32> = Vec::new();
        for (id, r) in self.loc.iter() {
            heads.push(r.last);
            let mut steps = 0u32;
            let mut link = r.last as i32;
            while link >= 0 && steps <= r.card {
                if !self.seq.holds(link as usize) {
                    errors += 1;
                    break;
                }
                let slot = self.seq.get(link as usize);
                if slot.id != id {
                    errors += 1;
                    break;
                }
                steps += 1;
                link = slot.prev;
            }
            if steps != r.card {
                errors += 1;
            }
        }
        let total = heads.len();
        heads.sort_unstable();
        heads.dedup();
        if heads.len() != total {
            errors += 1;
        }

        errors == 0
    }
}
