//! Frame codec for `bcc` messages.
//!
//! A frame is `(header, body)`: the header carries the absolute command id
//! (the peer's negotiated offset plus the message's local id) and a
//! compression flag; the body is the SSZ payload, snappy-compressed when the
//! outer handshake negotiated it. Transport framing around these two parts
//! belongs to the session layer.

use crate::message::{
    AttestationsMessage, BccMessage, BeaconBlocksMessage, GetBeaconBlocksMessage,
    NewBeaconBlockMessage, StatusMessage,
};
use crate::COMMAND_LENGTH;
use ssz::{Decode, DecodeError, Encode};

/// Length of an encoded frame header.
pub const HEADER_LENGTH: usize = 3;

#[derive(Debug)]
pub enum Error {
    /// The command id is outside this peer's id window.
    UnknownCommand { command_id: u16 },
    /// The peer's id offset leaves no room for this message's command.
    CommandIdOverflow { cmd_id_offset: u16, local_id: u16 },
    /// The header is the wrong length or carries an unknown flag byte.
    InvalidHeader,
    /// The peer sent a compressed frame but never negotiated compression.
    CompressionDisabled,
    /// The body failed SSZ decoding.
    Ssz(DecodeError),
    /// The body failed snappy (de)compression.
    Snappy(snap::Error),
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Error {
        Error::Ssz(e)
    }
}

impl From<snap::Error> for Error {
    fn from(e: snap::Error) -> Error {
        Error::Snappy(e)
    }
}

/// Frame header: absolute command id plus compression flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub command_id: u16,
    pub compressed: bool,
}

impl FrameHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LENGTH);
        bytes.extend_from_slice(&self.command_id.to_le_bytes());
        bytes.push(self.compressed as u8);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != HEADER_LENGTH {
            return Err(Error::InvalidHeader);
        }
        let command_id = u16::from_le_bytes([bytes[0], bytes[1]]);
        let compressed = match bytes[2] {
            0 => false,
            1 => true,
            _ => return Err(Error::InvalidHeader),
        };
        Ok(Self {
            command_id,
            compressed,
        })
    }
}

/// Encodes and decodes `bcc` frames for a single peer.
///
/// The command id offset is negotiated per peer during the outer handshake,
/// as is snappy support.
#[derive(Debug, Clone)]
pub struct BccCodec {
    cmd_id_offset: u16,
    snappy_support: bool,
}

impl BccCodec {
    pub fn new(cmd_id_offset: u16, snappy_support: bool) -> Self {
        Self {
            cmd_id_offset,
            snappy_support,
        }
    }

    /// The `(header, body)` frame for `message`.
    pub fn encode(&self, message: &BccMessage) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let payload = match message {
            BccMessage::Status(message) => message.as_ssz_bytes(),
            BccMessage::GetBeaconBlocks(message) => message.as_ssz_bytes(),
            BccMessage::BeaconBlocks(message) => message.as_ssz_bytes(),
            BccMessage::Attestations(message) => message.as_ssz_bytes(),
            BccMessage::NewBeaconBlock(message) => message.as_ssz_bytes(),
        };
        let command_id = self
            .cmd_id_offset
            .checked_add(message.local_id())
            .ok_or(Error::CommandIdOverflow {
                cmd_id_offset: self.cmd_id_offset,
                local_id: message.local_id(),
            })?;
        let body = if self.snappy_support {
            snap::raw::Encoder::new().compress_vec(&payload)?
        } else {
            payload
        };
        let header = FrameHeader {
            command_id,
            compressed: self.snappy_support,
        };
        Ok((header.to_bytes(), body))
    }

    /// Decodes a `(header, body)` frame received from the peer.
    pub fn decode(&self, header: &[u8], body: &[u8]) -> Result<BccMessage, Error> {
        let header = FrameHeader::from_bytes(header)?;
        let local_id = header
            .command_id
            .checked_sub(self.cmd_id_offset)
            .filter(|id| *id < COMMAND_LENGTH)
            .ok_or(Error::UnknownCommand {
                command_id: header.command_id,
            })?;
        if header.compressed && !self.snappy_support {
            return Err(Error::CompressionDisabled);
        }
        let payload = if header.compressed {
            snap::raw::Decoder::new().decompress_vec(body)?
        } else {
            body.to_vec()
        };
        let message = match local_id {
            0 => BccMessage::Status(StatusMessage::from_ssz_bytes(&payload)?),
            1 => BccMessage::GetBeaconBlocks(GetBeaconBlocksMessage::from_ssz_bytes(&payload)?),
            2 => BccMessage::BeaconBlocks(BeaconBlocksMessage::from_ssz_bytes(&payload)?),
            3 => BccMessage::Attestations(AttestationsMessage::from_ssz_bytes(&payload)?),
            4 => BccMessage::NewBeaconBlock(NewBeaconBlockMessage::from_ssz_bytes(&payload)?),
            _ => unreachable!("local id bounded by the command length"),
        };
        Ok(message)
    }
}
