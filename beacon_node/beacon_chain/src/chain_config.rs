use serde_derive::{Deserialize, Serialize};

/// Slots per epoch on mainnet.
pub const DEFAULT_SLOTS_PER_EPOCH: u64 = 32;

/// Minimum number of slots between an attestation and the block that
/// includes it.
pub const DEFAULT_MIN_ATTESTATION_INCLUSION_DELAY: u64 = 1;

#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub slots_per_epoch: u64,
    pub min_attestation_inclusion_delay: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            slots_per_epoch: DEFAULT_SLOTS_PER_EPOCH,
            min_attestation_inclusion_delay: DEFAULT_MIN_ATTESTATION_INCLUSION_DELAY,
        }
    }
}
