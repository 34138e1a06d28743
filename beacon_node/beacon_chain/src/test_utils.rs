//! An in-memory chain double for driving the wire servers in tests.

use crate::attestation_validation;
use crate::{BeaconChain, BlockImportError, ChainConfig, ChainError, StateMachine};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tree_hash::TreeHash;
use types::{Attestation, BeaconBlock, BeaconState, Hash256, Slot};

/// A `BeaconChain` backed by hash maps.
///
/// Importing a block indexes it by signing root and makes it canonical at
/// its slot (later imports at the same slot shadow earlier ones, which is
/// how tests stage reorgs). Blocks and attestations can be marked invalid up
/// front to exercise the rejection paths.
#[derive(Default)]
pub struct MemoryChain {
    config: ChainConfig,
    blocks: RwLock<HashMap<Hash256, BeaconBlock>>,
    canonical: RwLock<HashMap<Slot, Hash256>>,
    known_attestations: RwLock<HashSet<Hash256>>,
    invalid_blocks: RwLock<HashSet<Hash256>>,
    invalid_attestations: RwLock<HashSet<Hash256>>,
    head_state: RwLock<BeaconState>,
}

impl MemoryChain {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Inserts a block without running the import pipeline.
    pub fn put_block(&self, block: BeaconBlock) {
        let root = block.signing_root();
        self.canonical.write().insert(block.slot, root);
        self.blocks.write().insert(root, block);
    }

    pub fn set_head_slot(&self, slot: Slot) {
        self.head_state.write().slot = slot;
    }

    /// Marks an attestation root as already included on chain.
    pub fn add_known_attestation(&self, root: Hash256) {
        self.known_attestations.write().insert(root);
    }

    /// Makes `import_block` fail validation for this signing root.
    pub fn mark_invalid_block(&self, root: Hash256) {
        self.invalid_blocks.write().insert(root);
    }

    /// Makes `validate_attestation` fail for this tree hash root.
    pub fn mark_invalid_attestation(&self, root: Hash256) {
        self.invalid_attestations.write().insert(root);
    }

    pub fn contains_block(&self, root: &Hash256) -> bool {
        self.blocks.read().contains_key(root)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }
}

impl BeaconChain for MemoryChain {
    fn get_canonical_block_by_slot(&self, slot: Slot) -> Result<BeaconBlock, ChainError> {
        let root = *self
            .canonical
            .read()
            .get(&slot)
            .ok_or(ChainError::BlockNotFound)?;
        self.get_block_by_root(root)
    }

    fn get_block_by_root(&self, root: Hash256) -> Result<BeaconBlock, ChainError> {
        self.blocks
            .read()
            .get(&root)
            .cloned()
            .ok_or(ChainError::BlockNotFound)
    }

    fn import_block(&self, block: &BeaconBlock) -> Result<(), BlockImportError> {
        let root = block.signing_root();
        if self.invalid_blocks.read().contains(&root) {
            return Err(BlockImportError::Invalid(format!(
                "block {} marked invalid",
                root
            )));
        }
        self.put_block(block.clone());
        Ok(())
    }

    fn attestation_exists(&self, root: Hash256) -> Result<bool, ChainError> {
        Ok(self.known_attestations.read().contains(&root))
    }

    fn get_head_state(&self) -> BeaconState {
        self.head_state.read().clone()
    }

    fn get_state_machine(&self) -> &dyn StateMachine {
        self
    }
}

impl StateMachine for MemoryChain {
    fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn apply_state_transition(
        &self,
        _state: &BeaconState,
        future_slot: Slot,
    ) -> Result<BeaconState, ChainError> {
        Ok(BeaconState { slot: future_slot })
    }

    fn validate_attestation(
        &self,
        _state: &BeaconState,
        attestation: &Attestation,
    ) -> Result<(), attestation_validation::Error> {
        if self
            .invalid_attestations
            .read()
            .contains(&attestation.tree_hash_root())
        {
            return Err(attestation_validation::Error::Invalid(
                "attestation marked invalid".to_string(),
            ));
        }
        Ok(())
    }
}
