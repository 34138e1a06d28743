//! Event-bus payloads crossing the process boundary around the peer pool.

use crate::message::GetBeaconBlocksMessage;
use crate::peer::NodeId;
use types::BeaconBlock;

/// An inbound `GetBeaconBlocks`, routed to the request server.
#[derive(Debug, Clone, PartialEq)]
pub struct GetBeaconBlocksEvent {
    pub remote: NodeId,
    pub message: GetBeaconBlocksMessage,
}

/// Instructs the process owning the transport to reply to `remote` with
/// `blocks`.
#[derive(Debug, Clone, PartialEq)]
pub struct SendBeaconBlocksEvent {
    pub remote: NodeId,
    pub blocks: Vec<BeaconBlock>,
    pub request_id: u64,
}
