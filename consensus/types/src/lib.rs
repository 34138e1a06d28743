//! Value types exchanged over the `bcc` subprotocol.
//!
//! Everything here is an immutable value once decoded: blocks and
//! attestations are identified by their roots and round-trip through SSZ.

mod attestation;
mod beacon_block;
mod beacon_state;
mod slot;

pub use attestation::{Attestation, AttestationData};
pub use beacon_block::{BeaconBlock, BeaconBlockBody};
pub use beacon_state::BeaconState;
pub use slot::Slot;

pub type Hash256 = ethereum_types::H256;
