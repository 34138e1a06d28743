use crate::{Hash256, Slot};
use ssz::Encode as _;
use ssz_derive::{Decode, Encode};

/// The vote an attestation casts: a slot, a committee index and the block
/// being attested to.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,
    pub beacon_block_root: Hash256,
}

/// An attestation as carried on the wire and held in the attestation pool.
///
/// Its tree hash root is its identity; two attestations with the same root
/// are the same attestation.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Attestation {
    pub aggregation_bits: Vec<u8>,
    pub data: AttestationData,
    pub signature: Vec<u8>,
}

impl tree_hash::TreeHash for Attestation {
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

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::{Decode, Encode};
    use tree_hash::TreeHash;

    fn attestation(index: u64) -> Attestation {
        Attestation {
            aggregation_bits: vec![0b0000_0001],
            data: AttestationData {
                slot: Slot::new(4),
                index,
                beacon_block_root: Hash256::from_low_u64_be(index),
            },
            signature: vec![0; 96],
        }
    }

    #[test]
    fn root_identifies_the_attestation() {
        let a = attestation(0);
        let b = attestation(1);
        assert_eq!(a.tree_hash_root(), a.clone().tree_hash_root());
        assert_ne!(a.tree_hash_root(), b.tree_hash_root());
    }

    #[test]
    fn ssz_round_trip() {
        let a = attestation(7);
        let decoded =
            Attestation::from_ssz_bytes(&a.as_ssz_bytes()).expect("should decode attestation");
        assert_eq!(decoded, a);
    }
}
