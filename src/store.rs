//! Pattern storage capability — the engine's only window onto the outside.
//!
//! The engine consults the storage through four operations bundled into one
//! trait: naming ([`PatternStore::lex`]), the fusion policy
//! ([`PatternStore::sticky`]), lookup of already-minted pairs
//! ([`PatternStore::hunt`]) and minting ([`PatternStore::make`]). Injecting
//! the bundle at construction keeps the storage owned by the driver and makes
//! test doubles a one-struct affair.
//!
//! [`MemoryStore`] is the reference implementation: an in-memory semantic
//! storage with an atom table, a pair dictionary and an expansion glossary,
//! deduplicating patterns by their fully expanded atom sequence.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::identity::{is_valid, Identity, NIHIL};

/// External pattern storage consulted by the engine.
///
/// Implementations must be synchronous and must not call back into the
/// engine. `make` may assume `sticky` approved the pair and `hunt` found
/// nothing; it must return a valid, non-[`NIHIL`] identity.
pub trait PatternStore {
    /// Human-readable rendering of `id`, for diagnostics only.
    fn lex(&self, id: Identity) -> String;

    /// May `head` and `tail` legally be fused into a pattern?
    fn sticky(&self, head: Identity, tail: Identity) -> bool;

    /// Identity of a previously minted pattern whose first two constituents
    /// are `(head, tail)`, or [`NIHIL`] if none is known.
    fn hunt(&mut self, head: Identity, tail: Identity) -> Identity;

    /// Mint (and persist) a pattern identity for `(head, tail)`.
    fn make(&mut self, head: Identity, tail: Identity) -> Identity;
}

impl<S: PatternStore> PatternStore for &mut S {
    fn lex(&self, id: Identity) -> String {
        (**self).lex(id)
    }

    fn sticky(&self, head: Identity, tail: Identity) -> bool {
        (**self).sticky(head, tail)
    }

    fn hunt(&mut self, head: Identity, tail: Identity) -> Identity {
        (**self).hunt(head, tail)
    }

    fn make(&mut self, head: Identity, tail: Identity) -> Identity {
        (**self).make(head, tail)
    }
}

/// In-memory semantic storage.
///
/// Atoms are registered symbols; patterns are minted for pairs and stored
/// three ways: by identity (expansion), by pair view (dictionary) and by
/// expanded atom sequence (glossary). Two views whose expansions coincide
/// share one pattern identity — the glossary is the authority, the
/// dictionary a cache of views onto it.
///
/// "Frozen" atoms (typically spacing and punctuation) are excluded from
/// fusion: a pair sticks unless its head is frozen, or its tail is frozen
/// while the head is still atomic.
#[derive(Clone)]
pub struct MemoryStore {
    /// Atom identity to its symbol.
    symbols: HashMap<Identity, char>,
    /// Symbol to its atom identity.
    atoms: HashMap<char, Identity>,
    /// Atoms excluded from fusion.
    frozen: HashSet<Identity>,
    /// Pattern identity to its full atom expansion.
    patterns: HashMap<Identity, Vec<Identity>>,
    /// Pair view to pattern identity.
    dictionary: HashMap<(Identity, Identity), Identity>,
    /// Expanded atom sequence to pattern identity.
    glossary: HashMap<Vec<Identity>, Identity>,
    /// Next identity to hand out.
    next: Identity,
}

impl MemoryStore {
    /// An empty storage.
    pub fn new() -> Self {
        MemoryStore {
            symbols: HashMap::new(),
            atoms: HashMap::new(),
            frozen: HashSet::new(),
            patterns: HashMap::new(),
            dictionary: HashMap::new(),
            glossary: HashMap::new(),
            next: 1,
        }
    }

    fn allocate(&mut self) -> Identity {
        let id = self.next;
        self.next += 1;
        debug_assert!(is_valid(id), "identity space exhausted");
        id
    }

    /// Identity of the atom for `symbol`, registering it on first sight.
    pub fn atom(&mut self, symbol: char) -> Identity {
        if let Some(&id) = self.atoms.get(&symbol) {
            return id;
        }
        let id = self.allocate();
        self.atoms.insert(symbol, id);
        self.symbols.insert(id, symbol);
        id
    }

    /// Exclude `id` from fusion.
    pub fn freeze(&mut self, id: Identity) {
        self.frozen.insert(id);
    }

    /// Register `symbol` as an atom and exclude it from fusion.
    pub fn frozen_atom(&mut self, symbol: char) -> Identity {
        let id = self.atom(symbol);
        self.freeze(id);
        id
    }

    /// Whether `id` names a registered atom.
    pub fn atomic(&self, id: Identity) -> bool {
        self.symbols.contains_key(&id)
    }

    /// Whether `id` names a minted pattern.
    pub fn composite(&self, id: Identity) -> bool {
        self.patterns.contains_key(&id)
    }

    /// Whether `id` names anything this storage knows.
    pub fn exists(&self, id: Identity) -> bool {
        self.atomic(id) || self.composite(id)
    }

    /// Number of minted patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of cached pair views.
    pub fn view_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Iterate minted patterns as `(identity, expansion)`.
    pub fn patterns(&self) -> impl Iterator<Item = (Identity, &[Identity])> + '_ {
        self.patterns.iter().map(|(&id, seq)| (id, seq.as_slice()))
    }

    /// Append the atom expansion of `id` to `out`.
    fn unfold(&self, id: Identity, out: &mut Vec<Identity>) {
        if let Some(seq) = self.patterns.get(&id) {
            out.extend_from_slice(seq);
        } else {
            debug_assert!(self.atomic(id), "unfolding an unknown identity");
            out.push(id);
        }
    }

    /// Full atom expansion of the pair `(head, tail)`.
    fn expansion(&self, head: Identity, tail: Identity) -> Vec<Identity> {
        let mut seq = Vec::new();
        self.unfold(head, &mut seq);
        self.unfold(tail, &mut seq);
        seq
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternStore for MemoryStore {
    fn lex(&self, id: Identity) -> String {
        if let Some(&symbol) = self.symbols.get(&id) {
            return String::from(symbol);
        }
        if let Some(seq) = self.patterns.get(&id) {
            return seq
                .iter()
                .map(|atom| self.symbols.get(atom).copied().unwrap_or('?'))
                .collect();
        }
        format!("{{{}}}", id)
    }

    fn sticky(&self, head: Identity, tail: Identity) -> bool {
        if self.frozen.contains(&head) {
            return false;
        }
        if self.frozen.contains(&tail) && self.atomic(head) {
            return false;
        }
        true
    }

    fn hunt(&mut self, head: Identity, tail: Identity) -> Identity {
        if let Some(&id) = self.dictionary.get(&(head, tail)) {
            return id;
        }
        // The pair view is new, but the expanded sequence may already be a
        // known pattern minted from a different decomposition.
        let seq = self.expansion(head, tail);
        if let Some(&id) = self.glossary.get(&seq) {
            self.dictionary.insert((head, tail), id);
            return id;
        }
        NIHIL
    }

    fn make(&mut self, head: Identity, tail: Identity) -> Identity {
        debug_assert!(self.exists(head) && self.exists(tail));
        let seq = self.expansion(head, tail);
        debug_assert!(seq.len() >= 2);
        if let Some(&id) = self.glossary.get(&seq) {
            self.dictionary.insert((head, tail), id);
            return id;
        }
        let id = self.allocate();
        self.dictionary.insert((head, tail), id);
        self.glossary.insert(seq.clone(), id);
        self.patterns.insert(id, seq);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_registration_is_idempotent() {
        let mut store = MemoryStore::new();
        let a = store.atom('a');
        assert_eq!(store.atom('a'), a);
        assert_ne!(store.atom('b'), a);
        assert!(store.atomic(a));
        assert!(store.exists(a));
        assert!(!store.composite(a));
        assert_eq!(store.lex(a), "a");
    }

    #[test]
    fn test_sticky_excludes_frozen_heads_and_atomic_tails() {
        let mut store = MemoryStore::new();
        let a = store.atom('a');
        let b = store.atom('b');
        let spc = store.frozen_atom(' ');

        assert!(store.sticky(a, b));
        assert!(!store.sticky(spc, a));
        assert!(!store.sticky(a, spc));

        // A composite head may absorb a frozen tail.
        let ab = store.make(a, b);
        assert!(store.sticky(ab, spc));
        assert!(!store.sticky(spc, ab));
    }

    #[test]
    fn test_make_then_hunt() {
        let mut store = MemoryStore::new();
        let a = store.atom('a');
        let b = store.atom('b');
        assert_eq!(store.hunt(a, b), NIHIL);
        let ab = store.make(a, b);
        assert!(is_valid(ab));
        assert!(store.composite(ab));
        assert_eq!(store.hunt(a, b), ab);
        assert_eq!(store.lex(ab), "ab");
    }

    #[test]
    fn test_glossary_dedups_across_decompositions() {
        let mut store = MemoryStore::new();
        let a = store.atom('a');
        let b = store.atom('b');
        let c = store.atom('c');
        let ab = store.make(a, b);
        let bc = store.make(b, c);
        // (ab, c) and (a, bc) expand to the same atom sequence.
        let abc = store.make(ab, c);
        assert_eq!(store.hunt(a, bc), abc);
        assert_eq!(store.pattern_count(), 3);
        assert_eq!(store.lex(abc), "abc");
        // The alias view got cached.
        assert_eq!(store.view_count(), 4);
    }

    #[test]
    fn test_unknown_identity_lex() {
        let store = MemoryStore::new();
        assert_eq!(store.lex(12345), "{12345}");
    }
}
