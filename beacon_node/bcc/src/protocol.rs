//! Send half of the `bcc` subprotocol for a single peer.

use crate::codec::{self, BccCodec};
use crate::events::SendBeaconBlocksEvent;
use crate::message::{
    AttestationsMessage, BccMessage, BeaconBlocksMessage, GetBeaconBlocksMessage,
    NewBeaconBlockMessage, StatusMessage,
};
use crate::peer::NodeId;
use crate::{BlockSlotOrRoot, PROTOCOL_VERSION};
use slog::{debug, Logger};
use ssz::Encode;
use std::sync::Arc;
use tokio::sync::mpsc;
use types::{Attestation, BeaconBlock, Hash256, Slot};

/// Parameters for the `Status` handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BccHandshakeParams {
    pub protocol_version: u32,
    pub network_id: u64,
    pub genesis_root: Hash256,
    pub head_slot: Slot,
}

/// Failures from the session layer underneath the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The session to the peer is gone.
    Closed,
    /// The underlying connection failed.
    Io(String),
}

/// The session layer the driver writes frames to.
///
/// Sends must be cancellation safe: a message cut off by shutdown may or may
/// not have been delivered.
pub trait Transport: Send + Sync {
    fn send(&self, header: Vec<u8>, body: Vec<u8>) -> Result<(), TransportError>;
}

#[derive(Debug)]
pub enum Error {
    /// The handshake parameters disagree with the compiled protocol version.
    VersionMismatch { expected: u32, received: u32 },
    /// The transport rejected the frame.
    Transport(TransportError),
    /// The message could not be framed.
    Codec(codec::Error),
    /// The operation is not available on this driver.
    NotImplemented(&'static str),
}

impl From<codec::Error> for Error {
    fn from(e: codec::Error) -> Error {
        Error::Codec(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Error {
        Error::Transport(e)
    }
}

/// Per-peer driver for outbound `bcc` messages.
///
/// Holds no state beyond the negotiated command-id offset, the compression
/// flag and the transport handle.
pub struct BccProtocol {
    codec: BccCodec,
    transport: Arc<dyn Transport>,
    log: Logger,
}

impl BccProtocol {
    pub fn new(
        cmd_id_offset: u16,
        snappy_support: bool,
        transport: Arc<dyn Transport>,
        log: Logger,
    ) -> Self {
        Self {
            codec: BccCodec::new(cmd_id_offset, snappy_support),
            transport,
            log,
        }
    }

    /// Sends our `Status` message, failing fast when the caller believes it
    /// speaks a different version than this driver was compiled for.
    pub fn send_handshake(&self, params: &BccHandshakeParams) -> Result<(), Error> {
        if params.protocol_version != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch {
                expected: PROTOCOL_VERSION,
                received: params.protocol_version,
            });
        }
        debug!(
            self.log, "Sending status";
            "network_id" => params.network_id,
            "head_slot" => params.head_slot.as_u64(),
        );
        self.send(&BccMessage::Status(StatusMessage {
            protocol_version: params.protocol_version,
            network_id: params.network_id,
            genesis_root: params.genesis_root,
            head_slot: params.head_slot,
        }))
    }

    pub fn send_get_blocks(
        &self,
        block_slot_or_root: BlockSlotOrRoot,
        max_blocks: u64,
        request_id: u64,
    ) -> Result<(), Error> {
        self.send(&BccMessage::GetBeaconBlocks(GetBeaconBlocksMessage {
            request_id,
            block_slot_or_root,
            max_blocks,
        }))
    }

    /// Replies to a `GetBeaconBlocks` request.
    pub fn send_blocks(&self, blocks: &[BeaconBlock], request_id: u64) -> Result<(), Error> {
        let encoded_blocks = blocks.iter().map(|block| block.as_ssz_bytes()).collect();
        self.send(&BccMessage::BeaconBlocks(BeaconBlocksMessage {
            request_id,
            encoded_blocks,
        }))
    }

    pub fn send_attestation_records(&self, attestations: &[Attestation]) -> Result<(), Error> {
        let encoded_attestations = attestations
            .iter()
            .map(|attestation| attestation.as_ssz_bytes())
            .collect();
        self.send(&BccMessage::Attestations(AttestationsMessage {
            encoded_attestations,
        }))
    }

    pub fn send_new_block(&self, block: &BeaconBlock) -> Result<(), Error> {
        self.send(&BccMessage::NewBeaconBlock(NewBeaconBlockMessage {
            encoded_block: block.as_ssz_bytes(),
        }))
    }

    fn send(&self, message: &BccMessage) -> Result<(), Error> {
        let (header, body) = self.codec.encode(message)?;
        self.transport.send(header, body).map_err(Error::Transport)
    }
}

/// A `BccProtocol` usable outside the process that owns the peer pool.
///
/// Only `send_blocks` is delegated over the event bus; the request server is
/// the sole consumer and never needs the other sends.
pub struct ProxyBccProtocol {
    remote: NodeId,
    event_tx: mpsc::UnboundedSender<SendBeaconBlocksEvent>,
}

impl ProxyBccProtocol {
    pub fn new(remote: NodeId, event_tx: mpsc::UnboundedSender<SendBeaconBlocksEvent>) -> Self {
        Self { remote, event_tx }
    }

    pub fn send_get_blocks(
        &self,
        _block_slot_or_root: BlockSlotOrRoot,
        _max_blocks: u64,
        _request_id: u64,
    ) -> Result<(), Error> {
        Err(Error::NotImplemented("send_get_blocks"))
    }

    /// Hands the reply to the process that owns the transport, keyed by the
    /// peer's remote identity.
    pub fn send_blocks(&self, blocks: &[BeaconBlock], request_id: u64) -> Result<(), Error> {
        self.event_tx
            .send(SendBeaconBlocksEvent {
                remote: self.remote,
                blocks: blocks.to_vec(),
                request_id,
            })
            .map_err(|_| Error::Transport(TransportError::Closed))
    }

    pub fn send_attestation_records(&self, _attestations: &[Attestation]) -> Result<(), Error> {
        Err(Error::NotImplemented("send_attestation_records"))
    }

    pub fn send_new_block(&self, _block: &BeaconBlock) -> Result<(), Error> {
        Err(Error::NotImplemented("send_new_block"))
    }
}
