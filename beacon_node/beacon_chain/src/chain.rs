use crate::attestation_validation;
use crate::{BlockImportError, ChainConfig, ChainError};
use types::{Attestation, BeaconBlock, BeaconState, Hash256, Slot};

/// The chain database operations the wire servers consume.
///
/// Lookup misses surface as `ChainError::BlockNotFound` /
/// `ChainError::AttestationNotFound` and are signals, not failures; anything
/// else from this trait is fatal to the caller.
pub trait BeaconChain: Send + Sync {
    /// The block the chain currently considers canonical at `slot`.
    ///
    /// May change between calls while a reorg is in flight.
    fn get_canonical_block_by_slot(&self, slot: Slot) -> Result<BeaconBlock, ChainError>;

    /// The block with the given signing root, canonical or not.
    fn get_block_by_root(&self, root: Hash256) -> Result<BeaconBlock, ChainError>;

    /// Runs the full import pipeline on `block`.
    fn import_block(&self, block: &BeaconBlock) -> Result<(), BlockImportError>;

    /// Whether an attestation with this root has been included on chain.
    fn attestation_exists(&self, root: Hash256) -> Result<bool, ChainError>;

    /// The state at the current head.
    fn get_head_state(&self) -> BeaconState;

    /// The state machine for the current fork.
    fn get_state_machine(&self) -> &dyn StateMachine;
}

/// Per-fork consensus logic the receive server leans on.
pub trait StateMachine: Send + Sync {
    fn config(&self) -> &ChainConfig;

    /// Advances `state` to `future_slot` without applying a block.
    fn apply_state_transition(
        &self,
        state: &BeaconState,
        future_slot: Slot,
    ) -> Result<BeaconState, ChainError>;

    /// Full consensus validation of `attestation` against `state`.
    fn validate_attestation(
        &self,
        state: &BeaconState,
        attestation: &Attestation,
    ) -> Result<(), attestation_validation::Error>;
}
