use ssz::{Decode, DecodeError, Encode};
use types::{Hash256, Slot};

/// The start of a block request: either a slot on the canonical chain or an
/// exact signing root.
///
/// The wire form is the bare SSZ of the active variant; the decoder
/// dispatches on payload length (8 byte slot, 32 byte root).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSlotOrRoot {
    Slot(Slot),
    Root(Hash256),
}

impl Encode for BlockSlotOrRoot {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_bytes_len(&self) -> usize {
        match self {
            BlockSlotOrRoot::Slot(slot) => slot.ssz_bytes_len(),
            BlockSlotOrRoot::Root(root) => root.ssz_bytes_len(),
        }
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        match self {
            BlockSlotOrRoot::Slot(slot) => slot.ssz_append(buf),
            BlockSlotOrRoot::Root(root) => root.ssz_append(buf),
        }
    }
}

impl Decode for BlockSlotOrRoot {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        match bytes.len() {
            8 => Slot::from_ssz_bytes(bytes).map(BlockSlotOrRoot::Slot),
            32 => Hash256::from_ssz_bytes(bytes).map(BlockSlotOrRoot::Root),
            len => Err(DecodeError::BytesInvalid(format!(
                "{} bytes is neither a slot nor a root",
                len
            ))),
        }
    }
}
