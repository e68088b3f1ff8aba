//! Property tests: structural invariants over arbitrary input prefixes.

use proptest::prelude::*;

use chronicle::{codec, Chronicle, Identity, MemoryStore, NIHIL};

/// Map a generated symbol index onto a small alphabet where index 0 is a
/// frozen separator (space) and the rest are fusable letters.
fn symbol_for(index: u8) -> char {
    if index == 0 {
        ' '
    } else {
        (b'a' + index - 1) as char
    }
}

fn engine(capacity: usize) -> Chronicle<MemoryStore> {
    let mut store = MemoryStore::new();
    store.frozen_atom(' ');
    Chronicle::new(capacity, store)
}

/// Live identities, oldest first.
fn live(chronicle: &Chronicle<MemoryStore>) -> Vec<Identity> {
    let mut ids = Vec::new();
    chronicle.process(|slot, _| {
        if slot.id != NIHIL {
            ids.push(slot.id);
        }
        true
    });
    ids
}

proptest! {
    /// After every single inclusion: the structural audit passes, the
    /// len/size/gap arithmetic holds, and the ring never overfills.
    #[test]
    fn prop_invariants_hold_after_every_inclusion(
        symbols in prop::collection::vec(0u8..7, 1..160),
        capacity in 6usize..48,
    ) {
        let mut chronicle = engine(capacity);
        for &s in &symbols {
            let id = chronicle.store_mut().atom(symbol_for(s));
            prop_assert!(chronicle.incl(id));
            prop_assert!(chronicle.consistent(), "{}", chronicle.dump());
            prop_assert_eq!(chronicle.len(), chronicle.size() - chronicle.gap());
            prop_assert!(chronicle.size() as usize <= capacity);
        }
    }

    /// Compacting eliminates every hole, preserves the live sequence
    /// exactly, and leaves the audit green.
    #[test]
    fn prop_compact_preserves_the_live_sequence(
        symbols in prop::collection::vec(0u8..7, 1..160),
        capacity in 6usize..48,
    ) {
        let mut chronicle = engine(capacity);
        for &s in &symbols {
            let id = chronicle.store_mut().atom(symbol_for(s));
            prop_assert!(chronicle.incl(id));
        }
        let before = live(&chronicle);
        let distinct = chronicle.distinct();
        let gap_before = chronicle.gap();
        let removed = chronicle.compact();
        prop_assert_eq!(removed, gap_before);
        prop_assert_eq!(chronicle.gap(), 0);
        prop_assert_eq!(chronicle.size(), chronicle.len());
        prop_assert_eq!(live(&chronicle), before);
        prop_assert_eq!(chronicle.distinct(), distinct);
        prop_assert!(chronicle.consistent(), "{}", chronicle.dump());
    }

    /// Occurrence counts reported by the index match a plain recount of the
    /// live sequence.
    #[test]
    fn prop_counts_match_recount(
        symbols in prop::collection::vec(0u8..7, 1..120),
        capacity in 6usize..32,
    ) {
        let mut chronicle = engine(capacity);
        for &s in &symbols {
            let id = chronicle.store_mut().atom(symbol_for(s));
            prop_assert!(chronicle.incl(id));
        }
        let sequence = live(&chronicle);
        let mut counts: std::collections::HashMap<Identity, u32> = std::collections::HashMap::new();
        for &id in &sequence {
            *counts.entry(id).or_insert(0) += 1;
        }
        prop_assert_eq!(chronicle.distinct() as usize, counts.len());
        for (&id, &n) in &counts {
            prop_assert_eq!(chronicle.num(id), n);
            prop_assert!(chronicle.contains(id));
        }
    }

    /// The textual codec round-trips every 32-bit value.
    #[test]
    fn prop_codec_round_trips(value in any::<u32>()) {
        prop_assert_eq!(codec::decode(codec::encode(value).as_str()), Some(value));
    }
}
