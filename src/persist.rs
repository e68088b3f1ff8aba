//! File persistence for the identity sequence.
//!
//! Only the sequence itself is stored — one live identity per line, base-64
//! encoded by [`crate::codec`], oldest first. Holes are not part of the
//! sequence and are skipped; neither the pattern storage nor the occurrence
//! index is serialized (the index is derived state, the storage belongs to
//! the driver).
//!
//! Loading decodes and validates the whole file against the driver's
//! `exists` predicate before the first identity is re-included, so a bad
//! file leaves the chronicle untouched. Re-inclusion replays the ordinary
//! [`Chronicle::incl`] path and therefore re-folds deterministically given
//! the same storage.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::string::String;
use std::vec::Vec;

use crate::chronicle::Chronicle;
use crate::codec;
use crate::identity::{Identity, NIHIL};
use crate::store::PatternStore;

/// Why a [`Chronicle::load`] gave up.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Opening or reading the source file failed.
    #[error("reading the stored sequence failed")]
    Io(#[from] io::Error),
    /// A token was not a base-64 identity.
    #[error("malformed token `{0}` in the stored sequence")]
    Malformed(String),
    /// The stored sequence contains the reserved nihil identity.
    #[error("the stored sequence contains the reserved nihil identity")]
    Nihil,
    /// An identity in the file is unknown to the storage.
    #[error("identity {0} is unknown to the storage")]
    Unknown(Identity),
    /// Re-inclusion of an identity was rejected by the engine.
    #[error("identity {0} was rejected during re-inclusion")]
    Rejected(Identity),
}

impl<S: PatternStore> Chronicle<S> {
    /// Write the live identity sequence to `path`, oldest first.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut out = BufWriter::new(file);
        let mut status = Ok(());
        self.process(|slot, _| {
            if slot.id == NIHIL {
                return true;
            }
            match writeln!(out, "{}", codec::encode(slot.id).as_str()) {
                Ok(()) => true,
                Err(e) => {
                    status = Err(e);
                    false
                }
            }
        });
        status?;
        out.flush()
    }

    /// Append the sequence stored at `path` to this chronicle, identity by
    /// identity, after validating every token against `exists`.
    ///
    /// Returns the number of identities re-included. Validation failures
    /// ([`LoadError::Malformed`], [`LoadError::Nihil`],
    /// [`LoadError::Unknown`]) leave the chronicle untouched;
    /// [`LoadError::Rejected`] surfaces mid-replay and leaves the
    /// already-replayed prefix in place.
    pub fn load<P, F>(&mut self, path: P, exists: F) -> Result<usize, LoadError>
    where
        P: AsRef<Path>,
        F: Fn(Identity) -> bool,
    {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut sequence = Vec::new();
        for line in reader.lines() {
            let line = line?;
            for token in line.split_whitespace() {
                let id = codec::decode(token)
                    .ok_or_else(|| LoadError::Malformed(String::from(token)))?;
                if id == NIHIL {
                    return Err(LoadError::Nihil);
                }
                if !exists(id) {
                    return Err(LoadError::Unknown(id));
                }
                sequence.push(id);
            }
        }
        let mut included = 0;
        for id in sequence {
            if !self.incl(id) {
                return Err(LoadError::Rejected(id));
            }
            included += 1;
        }
        Ok(included)
    }
}
