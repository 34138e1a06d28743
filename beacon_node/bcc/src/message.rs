//! The five `bcc` subprotocol messages.
//!
//! Blocks and attestations inside list payloads are pre-encoded SSZ bytes:
//! the request server forwards stored bytes as-is and the receive server
//! decodes each element on receipt, so the codec never recurses into them.

use crate::BlockSlotOrRoot;
use ssz_derive::{Decode, Encode};
use types::{Hash256, Slot};

/// Handshake payload, exchanged immediately after connection.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct StatusMessage {
    pub protocol_version: u32,
    pub network_id: u64,
    pub genesis_root: Hash256,
    pub head_slot: Slot,
}

/// Asks a peer for up to `max_blocks` blocks starting at a slot or a root.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct GetBeaconBlocksMessage {
    pub request_id: u64,
    pub block_slot_or_root: BlockSlotOrRoot,
    pub max_blocks: u64,
}

/// Reply to `GetBeaconBlocks`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BeaconBlocksMessage {
    pub request_id: u64,
    pub encoded_blocks: Vec<Vec<u8>>,
}

/// Gossiped attestations, individually SSZ-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct AttestationsMessage {
    pub encoded_attestations: Vec<Vec<u8>>,
}

/// Announces a newly seen block.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct NewBeaconBlockMessage {
    pub encoded_block: Vec<u8>,
}

/// A decoded `bcc` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BccMessage {
    Status(StatusMessage),
    GetBeaconBlocks(GetBeaconBlocksMessage),
    BeaconBlocks(BeaconBlocksMessage),
    Attestations(AttestationsMessage),
    NewBeaconBlock(NewBeaconBlockMessage),
}

impl BccMessage {
    /// Command number within the subprotocol's id window.
    pub fn local_id(&self) -> u16 {
        match self {
            BccMessage::Status(_) => 0,
            BccMessage::GetBeaconBlocks(_) => 1,
            BccMessage::BeaconBlocks(_) => 2,
            BccMessage::Attestations(_) => 3,
            BccMessage::NewBeaconBlock(_) => 4,
        }
    }

    /// Static label for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BccMessage::Status(_) => "Status",
            BccMessage::GetBeaconBlocks(_) => "GetBeaconBlocks",
            BccMessage::BeaconBlocks(_) => "BeaconBlocks",
            BccMessage::Attestations(_) => "Attestations",
            BccMessage::NewBeaconBlock(_) => "NewBeaconBlock",
        }
    }
}
