use crate::{Attestation, Hash256, Slot};
use ssz::Encode as _;
use ssz_derive::{Decode, Encode};

/// The block payload; only attestations matter to the subprotocol core.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BeaconBlockBody {
    pub attestations: Vec<Attestation>,
}

/// A beacon block as exchanged with peers and stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody,
}

impl BeaconBlock {
    /// The root uniquely identifying this block.
    pub fn signing_root(&self) -> Hash256 {
        tree_hash::TreeHash::tree_hash_root(self)
    }
}

impl tree_hash::TreeHash for BeaconBlock {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Container
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("Container should never be packed.")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("Container should never be packed.")
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::merkle_root(&self.as_ssz_bytes(), 0)
    }
}
