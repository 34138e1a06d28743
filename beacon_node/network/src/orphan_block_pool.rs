use std::collections::HashMap;
use types::{BeaconBlock, Hash256};

#[derive(Debug, PartialEq)]
pub enum Error {
    /// No block with this signing root is in the pool.
    BlockNotFound(Hash256),
}

/// Blocks that arrived before their parent, keyed by signing root.
///
/// Membership says the parent was missing when the block was inserted; the
/// pool never re-checks the database.
#[derive(Debug, Default)]
pub struct OrphanBlockPool {
    pool: HashMap<Hash256, BeaconBlock>,
}

impl OrphanBlockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, block: &BeaconBlock) -> bool {
        self.contains_root(&block.signing_root())
    }

    /// Membership is a successful lookup.
    pub fn contains_root(&self, root: &Hash256) -> bool {
        self.get(root).is_ok()
    }

    pub fn get(&self, root: &Hash256) -> Result<&BeaconBlock, Error> {
        self.pool.get(root).ok_or(Error::BlockNotFound(*root))
    }

    /// Adding an already-pooled block is a no-op.
    pub fn add(&mut self, block: BeaconBlock) {
        self.pool.entry(block.signing_root()).or_insert(block);
    }

    /// Removes and returns every pooled block whose parent is `parent_root`,
    /// in no particular order.
    pub fn pop_children(&mut self, parent_root: &Hash256) -> Vec<BeaconBlock> {
        let roots: Vec<Hash256> = self
            .pool
            .iter()
            .filter(|(_, block)| block.parent_root == *parent_root)
            .map(|(root, _)| *root)
            .collect();
        roots
            .iter()
            .filter_map(|root| self.pool.remove(root))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
