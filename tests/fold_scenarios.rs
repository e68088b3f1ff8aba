//! End-to-end folding scenarios driven through a call-counting storage.
//!
//! The counting wrapper delegates to [`MemoryStore`] and records every
//! `make` invocation, so the scenarios can assert not just the resulting
//! buffer shape but exactly which patterns were minted along the way.

use chronicle::{Chronicle, Identity, MemoryStore, PatternStore, NIHIL};

/// Delegating storage that records minting activity.
struct CountingStore {
    inner: MemoryStore,
    makes: Vec<(Identity, Identity)>,
    hunts: usize,
}

impl CountingStore {
    fn new(inner: MemoryStore) -> Self {
        CountingStore { inner, makes: Vec::new(), hunts: 0 }
    }
}

impl PatternStore for CountingStore {
    fn lex(&self, id: Identity) -> String {
        self.inner.lex(id)
    }

    fn sticky(&self, head: Identity, tail: Identity) -> bool {
        self.inner.sticky(head, tail)
    }

    fn hunt(&mut self, head: Identity, tail: Identity) -> Identity {
        self.hunts += 1;
        self.inner.hunt(head, tail)
    }

    fn make(&mut self, head: Identity, tail: Identity) -> Identity {
        self.makes.push((head, tail));
        self.inner.make(head, tail)
    }
}

fn engine(capacity: usize) -> Chronicle<CountingStore> {
    Chronicle::new(capacity, CountingStore::new(MemoryStore::new()))
}

/// Live identities, oldest first.
fn live(chronicle: &Chronicle<CountingStore>) -> Vec<Identity> {
    let mut ids = Vec::new();
    chronicle.process(|slot, _| {
        if slot.id != NIHIL {
            ids.push(slot.id);
        }
        true
    });
    ids
}

#[test]
fn empty_chronicle_accepts_one_atom() {
    let mut chronicle = engine(8);
    let a = chronicle.store_mut().inner.atom('a');
    assert!(chronicle.incl(a));
    assert_eq!(chronicle.size(), 1);
    assert_eq!(chronicle.len(), 1);
    assert_eq!(chronicle.gap(), 0);
    assert_eq!(chronicle.distinct(), 1);
    assert_eq!(chronicle.last_id(), a);
    assert!(chronicle.store().makes.is_empty());
    // Nothing below the first element: no storage traffic at all.
    assert_eq!(chronicle.store().hunts, 0);
}

#[test]
fn repetition_mints_the_twin_pattern_once() {
    let mut chronicle = engine(16);
    let a = chronicle.store_mut().inner.atom('a');
    for _ in 0..4 {
        assert!(chronicle.incl(a));
    }
    // a a -> P1; a waits; a completes a known P1; P1 P1 -> P2.
    let twin_makes: Vec<_> = chronicle
        .store()
        .makes
        .iter()
        .filter(|&&(h, t)| h == a && t == a)
        .collect();
    assert_eq!(twin_makes.len(), 1);
    assert_eq!(chronicle.store().makes.len(), 2);
    assert_eq!(chronicle.len(), 1);
    let top = chronicle.last_id();
    assert_eq!(chronicle.store().lex(top), "aaaa");
    assert!(chronicle.consistent());
}

#[test]
fn frozen_separator_blocks_minting() {
    let mut chronicle = engine(8);
    let a = chronicle.store_mut().inner.atom('a');
    let spc = chronicle.store_mut().inner.frozen_atom(' ');
    for id in [a, spc, a] {
        assert!(chronicle.incl(id));
    }
    assert_eq!(chronicle.len(), 3);
    assert_eq!(live(&chronicle), vec![a, spc, a]);
    assert!(chronicle.store().makes.is_empty());
    assert!(chronicle.consistent());
}

#[test]
fn adjacency_discovery_mints_exactly_once() {
    let mut chronicle = engine(16);
    let a = chronicle.store_mut().inner.atom('a');
    let b = chronicle.store_mut().inner.atom('b');
    let c = chronicle.store_mut().inner.atom('c');
    for id in [a, b, c, a, b] {
        assert!(chronicle.incl(id));
    }
    assert_eq!(chronicle.store().makes, vec![(a, b)]);
    let pattern = chronicle.last_id();
    assert_eq!(chronicle.store().lex(pattern), "ab");
    // Two occurrences of the pattern around the surviving `c`, one hole
    // where the collapsed `a` sat.
    assert_eq!(live(&chronicle), vec![pattern, c, pattern]);
    assert_eq!(chronicle.size(), 4);
    assert_eq!(chronicle.len(), 3);
    assert_eq!(chronicle.gap(), 1);
    assert_eq!(chronicle.num(pattern), 2);
    assert!(!chronicle.contains(a));
    assert!(!chronicle.contains(b));
    assert!(chronicle.consistent());
}

#[test]
fn known_pair_folds_without_minting() {
    let mut chronicle = engine(16);
    let a = chronicle.store_mut().inner.atom('a');
    let b = chronicle.store_mut().inner.atom('b');
    let pattern = chronicle.store_mut().inner.make(a, b);
    for id in [a, b] {
        assert!(chronicle.incl(id));
    }
    // The dictionary already knew (a, b): the fold is immediate.
    assert!(chronicle.store().makes.is_empty());
    assert_eq!(chronicle.len(), 1);
    assert_eq!(chronicle.last_id(), pattern);
    assert_eq!(chronicle.gap(), 0);
    assert!(chronicle.consistent());
}

#[test]
fn eviction_forgets_the_oldest_identity() {
    let mut chronicle = engine(8);
    let mut atoms = Vec::new();
    for symbol in "abcdefghi".chars() {
        let id = chronicle.store_mut().inner.frozen_atom(symbol);
        atoms.push(id);
        assert!(chronicle.incl(id));
    }
    assert_eq!(chronicle.size(), 8);
    assert_eq!(chronicle.distinct(), 8);
    assert!(!chronicle.contains(atoms[0]));
    assert_eq!(chronicle.num(atoms[0]), 0);
    assert!(chronicle.consistent());
}

#[test]
fn compact_after_folding_restores_contiguity() {
    let mut chronicle = engine(16);
    let a = chronicle.store_mut().inner.atom('a');
    let b = chronicle.store_mut().inner.atom('b');
    let c = chronicle.store_mut().inner.atom('c');
    for id in [a, b, c, a, b] {
        assert!(chronicle.incl(id));
    }
    assert!(chronicle.gap() > 0);
    let sequence = live(&chronicle);
    let removed = chronicle.compact();
    assert!(removed > 0);
    assert_eq!(chronicle.gap(), 0);
    assert_eq!(chronicle.size(), chronicle.len());
    assert_eq!(live(&chronicle), sequence);
    assert!(chronicle.consistent());
}

#[test]
fn folding_continues_after_compaction() {
    let mut chronicle = engine(16);
    let a = chronicle.store_mut().inner.atom('a');
    let b = chronicle.store_mut().inner.atom('b');
    let c = chronicle.store_mut().inner.atom('c');
    for id in [a, b, c, a, b] {
        assert!(chronicle.incl(id));
    }
    chronicle.compact();
    // Another `c` completes (pattern, c), which occurred adjacently before;
    // the resulting twin pair then folds once more.
    assert!(chronicle.incl(c));
    assert_eq!(chronicle.store().makes[0], (a, b));
    assert_eq!(chronicle.store().makes.len(), 3);
    assert_eq!(chronicle.len(), 1);
    assert_eq!(chronicle.gap(), 0);
    let top = chronicle.last_id();
    assert_eq!(chronicle.store().lex(top), "abcabc");
    assert!(chronicle.consistent());
}

#[test]
fn wrap_heavy_traffic_stays_consistent() {
    // Capacity small enough to force a wrap every few inputs, with the
    // evicted index regularly coinciding with the landing index.
    let mut chronicle = engine(6);
    let a = chronicle.store_mut().inner.frozen_atom('a');
    let b = chronicle.store_mut().inner.frozen_atom('b');
    let c = chronicle.store_mut().inner.frozen_atom('c');
    let feed = [a, b, c, a, b, c, a, a, b, b, c, a, b, c, a, c, c, b, a, b];
    for (k, id) in feed.iter().enumerate() {
        assert!(chronicle.incl(*id));
        assert!(chronicle.consistent(), "step {}:\n{}", k, chronicle.dump());
        assert_eq!(chronicle.len(), chronicle.size() - chronicle.gap());
    }
    assert_eq!(chronicle.size(), 6);
}
