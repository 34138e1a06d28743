use std::collections::HashMap;
use tree_hash::TreeHash;
use types::{Attestation, Hash256};

#[derive(Debug, PartialEq)]
pub enum Error {
    /// No attestation with this root is in the pool.
    AttestationNotFound(Hash256),
}

/// Attestations seen on the wire but not yet included in a block, keyed by
/// their tree hash root.
// TODO: the pool grows without bound; back it with an lru cache or the
// database.
#[derive(Debug, Default)]
pub struct AttestationPool {
    pool: HashMap<Hash256, Attestation>,
}

impl AttestationPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, attestation: &Attestation) -> bool {
        self.contains_root(&attestation.tree_hash_root())
    }

    /// Membership is a successful lookup.
    pub fn contains_root(&self, root: &Hash256) -> bool {
        self.get(root).is_ok()
    }

    pub fn get(&self, root: &Hash256) -> Result<&Attestation, Error> {
        self.pool.get(root).ok_or(Error::AttestationNotFound(*root))
    }

    /// Snapshot of the pool, in no particular order.
    pub fn get_all(&self) -> Vec<Attestation> {
        self.pool.values().cloned().collect()
    }

    pub fn add(&mut self, attestation: Attestation) {
        self.pool.insert(attestation.tree_hash_root(), attestation);
    }

    pub fn batch_add<I>(&mut self, attestations: I)
    where
        I: IntoIterator<Item = Attestation>,
    {
        for attestation in attestations {
            self.add(attestation);
        }
    }

    pub fn remove(&mut self, attestation: &Attestation) {
        self.pool.remove(&attestation.tree_hash_root());
    }

    pub fn batch_remove<'a, I>(&mut self, attestations: I)
    where
        I: IntoIterator<Item = &'a Attestation>,
    {
        for attestation in attestations {
            self.remove(attestation);
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
