//! Message-level reconcilers for the `bcc` subprotocol: the in-memory pools
//! plus the request and receive servers that drive them.

pub mod attestation_pool;
pub mod orphan_block_pool;
pub mod receive_server;
pub mod request_server;

pub use attestation_pool::AttestationPool;
pub use orphan_block_pool::OrphanBlockPool;
pub use receive_server::{BccReceiveServer, ReceiveMessage};
pub use request_server::BccRequestServer;
