use crate::protocol::BccProtocol;
use ethereum_types::H512;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A peer's devp2p node identity (its public key).
///
/// Broadcast suppression compares these, never peer objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(H512);

impl NodeId {
    pub fn new(id: H512) -> Self {
        Self(id)
    }

    pub fn random() -> Self {
        Self(H512::random())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected peer speaking the `bcc` subprotocol.
pub struct BccPeer {
    remote: NodeId,
    protocol: BccProtocol,
    operational: AtomicBool,
}

impl BccPeer {
    /// Peers start non-operational; the session layer flips the flag once
    /// the handshake completes.
    pub fn new(remote: NodeId, protocol: BccProtocol) -> Self {
        Self {
            remote,
            protocol,
            operational: AtomicBool::new(false),
        }
    }

    pub fn remote(&self) -> NodeId {
        self.remote
    }

    pub fn protocol(&self) -> &BccProtocol {
        &self.protocol
    }

    pub fn is_operational(&self) -> bool {
        self.operational.load(Ordering::Relaxed)
    }

    pub fn set_operational(&self, operational: bool) {
        self.operational.store(operational, Ordering::Relaxed)
    }
}

/// The peers currently connected, indexed by remote identity.
///
/// Membership is managed by the session layer; the servers only read.
#[derive(Default)]
pub struct BccPeerPool {
    peers: RwLock<HashMap<NodeId, Arc<BccPeer>>>,
}

impl BccPeerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, peer: Arc<BccPeer>) {
        self.peers.write().insert(peer.remote(), peer);
    }

    pub fn remove(&self, remote: &NodeId) -> Option<Arc<BccPeer>> {
        self.peers.write().remove(remote)
    }

    pub fn get(&self, remote: &NodeId) -> Option<Arc<BccPeer>> {
        self.peers.read().get(remote).cloned()
    }

    /// Snapshot of the connected peers, in no particular order.
    pub fn connected_peers(&self) -> Vec<Arc<BccPeer>> {
        self.peers.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CaptureTransport;
    use sloggers::null::NullLoggerBuilder;
    use sloggers::Build;

    fn peer() -> Arc<BccPeer> {
        let log = NullLoggerBuilder.build().expect("should build null logger");
        let protocol = BccProtocol::new(0, false, CaptureTransport::new(), log);
        Arc::new(BccPeer::new(NodeId::random(), protocol))
    }

    #[test]
    fn peers_start_non_operational() {
        let peer = peer();
        assert!(!peer.is_operational());
        peer.set_operational(true);
        assert!(peer.is_operational());
    }

    #[test]
    fn pool_tracks_membership_by_remote_identity() {
        let pool = BccPeerPool::new();
        let first = peer();
        let second = peer();
        pool.insert(first.clone());
        pool.insert(second.clone());

        assert_eq!(pool.len(), 2);
        assert!(pool.get(&first.remote()).is_some());
        assert_eq!(pool.connected_peers().len(), 2);

        pool.remove(&first.remote());
        assert!(pool.get(&first.remote()).is_none());
        assert_eq!(pool.len(), 1);
    }
}
