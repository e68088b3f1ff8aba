//! # chronicle
//!
//! Online stream compaction over a fixed-capacity ring.
//!
//! A chronicle consumes a sequence of atomic identities — characters, in the
//! classic setup — and maintains a compacted working tail in which recurring
//! adjacent pairs are folded into freshly minted *pattern* identities. The
//! pattern dictionary itself lives outside: the engine consults it through a
//! four-operation capability trait injected at construction.
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Chronicle`] | The engine: feeds identities, folds pairs, keeps statistics |
//! | [`Ring`] / [`Slot`] | Fixed-capacity ring of slots with intrusive per-identity occurrence chains |
//! | [`OccurrenceIndex`] / [`Ref`] | Flat Robin-Hood map: identity → newest occurrence and live count |
//! | [`PatternStore`] | Capability trait for the external pattern storage |
//! | [`MemoryStore`] | In-memory reference storage: atom table, pair dictionary, expansion glossary |
//! | [`codec`] | Base-64 codec used by the textual sequence dump |
//!
//! Identities are 24-bit; [`NIHIL`] (zero) is reserved for "absent" and marks
//! the holes pattern substitution leaves behind until [`Chronicle::compact`]
//! sweeps them out. Memory is bounded at construction: the ring, the index
//! and the codec buffers never allocate after that.
//!
//! ## Example
//!
//! ```rust
//! use chronicle::{Chronicle, MemoryStore, PatternStore};
//!
//! let mut chronicle = Chronicle::new(64, MemoryStore::new());
//! let a = chronicle.store_mut().atom('a');
//! let b = chronicle.store_mut().atom('b');
//! for id in [a, b, a, b] {
//!     assert!(chronicle.incl(id));
//! }
//! // `ab ab` collapsed into a single nested pattern.
//! assert_eq!(chronicle.len(), 1);
//! assert_eq!(chronicle.store().lex(chronicle.last_id()), "abab");
//! ```
//!
//! ## no_std
//!
//! The core is `no_std` + `alloc`. The `std` feature (on by default) adds
//! file persistence ([`Chronicle::save`] / [`Chronicle::load`]). The `serde`
//! feature derives `Serialize`/`Deserialize` on the public value types.

#![no_std]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chronicle;
pub mod codec;
pub mod identity;
pub mod index;
#[cfg(feature = "std")]
pub mod persist;
pub mod ring;
pub mod store;

pub use crate::chronicle::{Chronicle, MIN_CAPACITY};
pub use crate::identity::{Identity, IDENTITY_LIMIT, NIHIL};
pub use crate::index::{Note, OccurrenceIndex, Ref};
#[cfg(feature = "std")]
pub use crate::persist::LoadError;
pub use crate::ring::{Ring, Slot, NO_PREV};
pub use crate::store::{MemoryStore, PatternStore};
