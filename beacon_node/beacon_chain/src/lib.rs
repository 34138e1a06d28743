//! Contracts between the `bcc` wire servers and the beacon chain proper.
//!
//! The chain database and state-transition function live elsewhere; this
//! crate pins down the slice of their behavior the servers rely on, plus the
//! one piece of consensus logic the servers run themselves: the attestation
//! inclusion-window check.

pub mod attestation_validation;
mod chain;
mod chain_config;
mod errors;
pub mod test_utils;

pub use chain::{BeaconChain, StateMachine};
pub use chain_config::ChainConfig;
pub use errors::{BlockImportError, ChainError};
