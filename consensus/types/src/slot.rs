use ssz::DecodeError;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A beacon chain slot, the chain's monotonically increasing time unit.
///
/// Arithmetic with raw `u64`s saturates rather than wraps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u64);

impl Slot {
    pub const fn new(slot: u64) -> Self {
        Self(slot)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Slot {
    fn from(slot: u64) -> Self {
        Self(slot)
    }
}

impl From<Slot> for u64 {
    fn from(slot: Slot) -> u64 {
        slot.0
    }
}

impl Add<u64> for Slot {
    type Output = Slot;

    fn add(self, other: u64) -> Slot {
        Slot(self.0.saturating_add(other))
    }
}

impl AddAssign<u64> for Slot {
    fn add_assign(&mut self, other: u64) {
        *self = *self + other;
    }
}

impl Sub<u64> for Slot {
    type Output = Slot;

    fn sub(self, other: u64) -> Slot {
        Slot(self.0.saturating_sub(other))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ssz::Encode for Slot {
    fn is_ssz_fixed_len() -> bool {
        <u64 as ssz::Encode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u64 as ssz::Encode>::ssz_fixed_len()
    }

    fn ssz_bytes_len(&self) -> usize {
        ssz::Encode::ssz_bytes_len(&self.0)
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        ssz::Encode::ssz_append(&self.0, buf)
    }
}

impl ssz::Decode for Slot {
    fn is_ssz_fixed_len() -> bool {
        <u64 as ssz::Decode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <u64 as ssz::Decode>::ssz_fixed_len()
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        <u64 as ssz::Decode>::from_ssz_bytes(bytes).map(Self)
    }
}

impl tree_hash::TreeHash for Slot {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::Basic
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        tree_hash::TreeHash::tree_hash_packed_encoding(&self.0)
    }

    fn tree_hash_packing_factor() -> usize {
        <u64 as tree_hash::TreeHash>::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        tree_hash::TreeHash::tree_hash_root(&self.0)
    }
}
