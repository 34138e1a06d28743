//! The `bcc` devp2p subprotocol: typed wire messages, the frame codec and
//! the per-peer drivers used to exchange beacon blocks and attestations.

mod block_slot_or_root;
pub mod codec;
pub mod events;
pub mod message;
pub mod peer;
pub mod protocol;
pub mod test_utils;

pub use block_slot_or_root::BlockSlotOrRoot;
pub use codec::{BccCodec, FrameHeader};
pub use message::{
    AttestationsMessage, BccMessage, BeaconBlocksMessage, GetBeaconBlocksMessage,
    NewBeaconBlockMessage, StatusMessage,
};
pub use peer::{BccPeer, BccPeerPool, NodeId};
pub use protocol::{BccHandshakeParams, BccProtocol, ProxyBccProtocol, Transport, TransportError};

/// Subprotocol name advertised in the outer devp2p handshake.
pub const PROTOCOL_NAME: &str = "bcc";

/// The protocol version this driver speaks.
pub const PROTOCOL_VERSION: u32 = 0;

/// Number of command ids the subprotocol occupies.
pub const COMMAND_LENGTH: u16 = 5;
