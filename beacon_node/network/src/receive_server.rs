//! The receive half of the `bcc` subprotocol.
//!
//! Ingests attestations and blocks from peers, classifies them (importable,
//! orphan, invalid, duplicate), drives the recursive fetch of missing
//! ancestors and re-broadcasts novelty without echoing it back at the
//! sender. The server owns both pools and the table of outstanding block
//! requests; all mutation happens on its own task, so each handler is
//! atomic with respect to pool invariants.

use crate::attestation_pool::AttestationPool;
use crate::orphan_block_pool::OrphanBlockPool;
use bcc::message::{
    AttestationsMessage, BccMessage, BeaconBlocksMessage, NewBeaconBlockMessage,
};
use bcc::peer::{BccPeer, BccPeerPool, NodeId};
use bcc::BlockSlotOrRoot;
use beacon_chain::{
    attestation_validation, BeaconChain, BlockImportError, ChainError, StateMachine,
};
use slog::{crit, debug, warn, Logger};
use ssz::{Decode, DecodeError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tree_hash::TreeHash;
use types::{Attestation, BeaconBlock, Hash256};

/// Messages the receive server consumes from the router and local services.
#[derive(Debug)]
pub enum ReceiveMessage {
    /// A decoded subprotocol message from the given peer.
    Peer(NodeId, BccMessage),
    /// Replies with the attestations currently eligible for inclusion.
    ReadyAttestations(oneshot::Sender<Vec<Attestation>>),
}

#[derive(Debug, PartialEq)]
pub enum Error {
    /// The peer announced a block we have already seen.
    DuplicateBlock(Hash256),
    /// A reply carried a request id we never issued.
    UnknownRequestId(u64),
    /// A reply must carry exactly one block.
    UnexpectedBlockCount(usize),
    /// The replied block is not the one we asked for.
    BlockRootMismatch {
        expected: Hash256,
        received: Hash256,
    },
    /// An inner payload element failed to decode.
    Ssz(DecodeError),
    /// The router delivered a message this server is not subscribed to.
    NotSubscribed(&'static str),
    /// The chain failed in a way that is not recoverable here.
    Chain(ChainError),
    /// Block import failed with something other than a validation error.
    Import(BlockImportError),
}

impl Error {
    /// Fatal errors indicate a bug or a broken database rather than a
    /// misbehaving peer; the server loop terminates on them.
    fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Chain(_) | Error::Import(_) | Error::NotSubscribed(_)
        )
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Error {
        Error::Ssz(e)
    }
}

/// Reconciles blocks and attestations received from peers with the local
/// chain.
pub struct BccReceiveServer<C> {
    chain: Arc<C>,
    peer_pool: Arc<BccPeerPool>,
    attestation_pool: AttestationPool,
    orphan_block_pool: OrphanBlockPool,
    /// Outstanding block requests, keyed by request id.
    // TODO: entries for peers that never reply are kept forever; expire them.
    pending_requests: HashMap<u64, Hash256>,
    log: Logger,
}

impl<C: BeaconChain + 'static> BccReceiveServer<C> {
    pub fn new(chain: Arc<C>, peer_pool: Arc<BccPeerPool>, log: Logger) -> Self {
        Self {
            chain,
            peer_pool,
            attestation_pool: AttestationPool::new(),
            orphan_block_pool: OrphanBlockPool::new(),
            pending_requests: HashMap::new(),
            log,
        }
    }

    /// Consumes `ReceiveMessage`s until `exit` fires or the channel closes.
    pub fn spawn(
        mut self,
        mut message_rx: mpsc::UnboundedReceiver<ReceiveMessage>,
        exit: exit_future::Exit,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::pin!(exit);
            loop {
                tokio::select! {
                    _ = &mut exit => {
                        debug!(self.log, "Receive server shutting down");
                        break;
                    }
                    message = message_rx.recv() => match message {
                        Some(ReceiveMessage::Peer(from, message)) => {
                            match self.handle_message(from, message) {
                                Ok(()) => {}
                                Err(e) if e.is_fatal() => {
                                    crit!(
                                        self.log, "Receive server failed";
                                        "error" => format!("{:?}", e),
                                    );
                                    break;
                                }
                                Err(e) => warn!(
                                    self.log, "Invalid message from peer";
                                    "peer" => format!("{}", from),
                                    "error" => format!("{:?}", e),
                                ),
                            }
                        }
                        Some(ReceiveMessage::ReadyAttestations(reply)) => {
                            let _ = reply.send(self.get_ready_attestations());
                        }
                        None => break,
                    }
                }
            }
        })
    }

    /// Dispatches one subprotocol message. Messages from unknown or
    /// non-operational peers are dropped silently.
    pub fn handle_message(&mut self, from: NodeId, message: BccMessage) -> Result<(), Error> {
        let peer = match self.peer_pool.get(&from) {
            Some(peer) => peer,
            None => {
                debug!(
                    self.log, "Message from unknown peer";
                    "peer" => format!("{}", from),
                );
                return Ok(());
            }
        };
        if !peer.is_operational() {
            return Ok(());
        }
        match message {
            BccMessage::Attestations(message) => self.handle_attestations(&peer, message),
            BccMessage::NewBeaconBlock(message) => self.handle_new_beacon_block(&peer, message),
            BccMessage::BeaconBlocks(message) => self.handle_beacon_blocks(&peer, message),
            other => Err(Error::NotSubscribed(other.name())),
        }
    }

    /// The pooled attestations whose inclusion window is currently open.
    // TODO: evict attestations that have fallen out of the window.
    pub fn get_ready_attestations(&self) -> Vec<Attestation> {
        let state_machine = self.chain.get_state_machine();
        let config = state_machine.config();
        let state = self.chain.get_head_state();
        self.attestation_pool
            .get_all()
            .into_iter()
            .filter(|attestation| {
                attestation_validation::validate_attestation_slot(
                    attestation.data.slot,
                    state.slot,
                    config.slots_per_epoch,
                    config.min_attestation_inclusion_delay,
                )
                .is_ok()
            })
            .collect()
    }

    fn handle_attestations(
        &mut self,
        peer: &BccPeer,
        message: AttestationsMessage,
    ) -> Result<(), Error> {
        let attestations = message
            .encoded_attestations
            .iter()
            .map(|bytes| Attestation::from_ssz_bytes(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            self.log, "Received attestations";
            "peer" => format!("{}", peer.remote()),
            "count" => attestations.len(),
        );

        // Validate before the freshness check, so junk cannot reach the
        // gossip pass.
        let valid_attestations = self.validate_attestations(&attestations)?;
        if valid_attestations.is_empty() {
            return Ok(());
        }

        let mut new_attestations = Vec::with_capacity(valid_attestations.len());
        for attestation in valid_attestations {
            if self.is_attestation_new(&attestation)? {
                new_attestations.push(attestation);
            }
        }
        if new_attestations.is_empty() {
            return Ok(());
        }

        self.attestation_pool
            .batch_add(new_attestations.iter().cloned());
        self.broadcast_attestations(&new_attestations, Some(peer.remote()));
        Ok(())
    }

    fn handle_new_beacon_block(
        &mut self,
        peer: &BccPeer,
        message: NewBeaconBlockMessage,
    ) -> Result<(), Error> {
        let block = BeaconBlock::from_ssz_bytes(&message.encoded_block)?;
        if self.is_block_seen(&block)? {
            return Err(Error::DuplicateBlock(block.signing_root()));
        }
        debug!(
            self.log, "Received new block";
            "peer" => format!("{}", peer.remote()),
            "root" => format!("{}", block.signing_root()),
            "slot" => block.slot.as_u64(),
        );
        if self.process_received_block(block.clone())? {
            self.broadcast_block(&block, Some(peer.remote()));
        }
        Ok(())
    }

    fn handle_beacon_blocks(
        &mut self,
        peer: &BccPeer,
        message: BeaconBlocksMessage,
    ) -> Result<(), Error> {
        let request_id = message.request_id;
        let expected_root = *self
            .pending_requests
            .get(&request_id)
            .ok_or(Error::UnknownRequestId(request_id))?;
        // TODO: accept batches once requests ask for more than one block.
        if message.encoded_blocks.len() != 1 {
            return Err(Error::UnexpectedBlockCount(message.encoded_blocks.len()));
        }
        let block = BeaconBlock::from_ssz_bytes(&message.encoded_blocks[0])?;
        let received = block.signing_root();
        if received != expected_root {
            return Err(Error::BlockRootMismatch {
                expected: expected_root,
                received,
            });
        }
        debug!(
            self.log, "Received requested block";
            "peer" => format!("{}", peer.remote()),
            "request_id" => request_id,
            "root" => format!("{}", received),
        );
        // A targeted fetch, not gossip: the import outcome does not trigger
        // a broadcast.
        self.process_received_block(block)?;
        self.pending_requests.remove(&request_id);
        Ok(())
    }

    /// Filters `attestations` down to those passing consensus validation
    /// against the head state advanced past each attestation's inclusion
    /// delay.
    fn validate_attestations(
        &self,
        attestations: &[Attestation],
    ) -> Result<Vec<Attestation>, Error> {
        let state_machine = self.chain.get_state_machine();
        let config = state_machine.config();
        let state = self.chain.get_head_state();

        let mut valid = Vec::with_capacity(attestations.len());
        for attestation in attestations {
            let future_slot = attestation.data.slot + config.min_attestation_inclusion_delay;
            let future_state = state_machine
                .apply_state_transition(&state, future_slot)
                .map_err(Error::Chain)?;
            match state_machine.validate_attestation(&future_state, attestation) {
                Ok(()) => valid.push(attestation.clone()),
                Err(e) => debug!(
                    self.log, "Dropping invalid attestation";
                    "slot" => attestation.data.slot.as_u64(),
                    "reason" => format!("{:?}", e),
                ),
            }
        }
        Ok(valid)
    }

    /// An attestation is new when it is neither pooled nor already on chain.
    fn is_attestation_new(&self, attestation: &Attestation) -> Result<bool, Error> {
        let root = attestation.tree_hash_root();
        if self.attestation_pool.contains_root(&root) {
            return Ok(false);
        }
        match self.chain.attestation_exists(root) {
            Ok(exists) => Ok(!exists),
            Err(ChainError::AttestationNotFound) => Ok(true),
            Err(e) => Err(Error::Chain(e)),
        }
    }

    /// Runs the import pipeline on a block received from a peer.
    ///
    /// Returns `true` when the block was imported and should be forwarded to
    /// other peers.
    fn process_received_block(&mut self, block: BeaconBlock) -> Result<bool, Error> {
        let block_root = block.signing_root();

        // An orphan goes straight to the pool, and every peer is asked for
        // the missing parent.
        if !self.is_block_root_in_db(&block.parent_root)? {
            if !self.orphan_block_pool.contains(&block) {
                debug!(
                    self.log, "Found orphan block";
                    "root" => format!("{}", block_root),
                    "parent_root" => format!("{}", block.parent_root),
                );
                let parent_root = block.parent_root;
                self.orphan_block_pool.add(block);
                self.request_block_from_peers(parent_root);
            }
            return Ok(false);
        }

        match self.chain.import_block(&block) {
            Err(BlockImportError::Invalid(reason)) => {
                debug!(
                    self.log, "Failed to import invalid block";
                    "root" => format!("{}", block_root),
                    "reason" => reason,
                );
                // TODO: drop the block's descendants from the orphan pool
                // as well.
                Ok(false)
            }
            Err(e) => Err(Error::Import(e)),
            Ok(()) => {
                self.try_import_orphan_blocks(block_root)?;
                self.attestation_pool
                    .batch_remove(block.body.attestations.iter());
                Ok(true)
            }
        }
    }

    /// Imports pooled blocks whose ancestry was just completed, breadth
    /// first from the children of `parent_root`.
    ///
    /// Terminates because every round removes members from the orphan pool.
    fn try_import_orphan_blocks(&mut self, parent_root: Hash256) -> Result<(), Error> {
        let mut imported_roots = vec![parent_root];
        while let Some(current_parent_root) = imported_roots.pop() {
            if !self.is_block_root_in_db(&current_parent_root)? {
                continue;
            }
            let children = self.orphan_block_pool.pop_children(&current_parent_root);
            if !children.is_empty() {
                debug!(
                    self.log, "Orphan blocks match an imported parent";
                    "parent_root" => format!("{}", current_parent_root),
                    "count" => children.len(),
                );
            }
            for child in children {
                match self.chain.import_block(&child) {
                    Ok(()) => {
                        self.attestation_pool
                            .batch_remove(child.body.attestations.iter());
                        imported_roots.push(child.signing_root());
                    }
                    Err(BlockImportError::Invalid(reason)) => {
                        debug!(
                            self.log, "Failed to import orphan block";
                            "root" => format!("{}", child.signing_root()),
                            "reason" => reason,
                        );
                        // The rejected block's attestations are shed as
                        // well, mirroring the import path above even though
                        // they were never included.
                        self.attestation_pool
                            .batch_remove(child.body.attestations.iter());
                    }
                    Err(e) => return Err(Error::Import(e)),
                }
            }
        }
        Ok(())
    }

    /// Asks every connected peer for `block_root`, recording one pending
    /// request per peer.
    fn request_block_from_peers(&mut self, block_root: Hash256) {
        for peer in self.peer_pool.connected_peers() {
            let request_id: u64 = rand::random();
            debug!(
                self.log, "Requesting block";
                "peer" => format!("{}", peer.remote()),
                "root" => format!("{}", block_root),
                "request_id" => request_id,
            );
            self.pending_requests.insert(request_id, block_root);
            if let Err(e) =
                peer.protocol()
                    .send_get_blocks(BlockSlotOrRoot::Root(block_root), 1, request_id)
            {
                warn!(
                    self.log, "Failed to request block";
                    "peer" => format!("{}", peer.remote()),
                    "error" => format!("{:?}", e),
                );
            }
        }
    }

    /// Sends `attestations` to every connected peer except `from_peer`.
    fn broadcast_attestations(&self, attestations: &[Attestation], from_peer: Option<NodeId>) {
        for peer in self.peer_pool.connected_peers() {
            if from_peer == Some(peer.remote()) {
                continue;
            }
            if let Err(e) = peer.protocol().send_attestation_records(attestations) {
                warn!(
                    self.log, "Failed to send attestations";
                    "peer" => format!("{}", peer.remote()),
                    "error" => format!("{:?}", e),
                );
            }
        }
    }

    /// Sends `block` to every connected peer except `from_peer`.
    fn broadcast_block(&self, block: &BeaconBlock, from_peer: Option<NodeId>) {
        for peer in self.peer_pool.connected_peers() {
            if from_peer == Some(peer.remote()) {
                continue;
            }
            if let Err(e) = peer.protocol().send_new_block(block) {
                warn!(
                    self.log, "Failed to send block";
                    "peer" => format!("{}", peer.remote()),
                    "error" => format!("{:?}", e),
                );
            }
        }
    }

    fn is_block_seen(&self, block: &BeaconBlock) -> Result<bool, Error> {
        self.is_block_root_seen(&block.signing_root())
    }

    fn is_block_root_seen(&self, block_root: &Hash256) -> Result<bool, Error> {
        if self.orphan_block_pool.contains_root(block_root) {
            return Ok(true);
        }
        self.is_block_root_in_db(block_root)
    }

    fn is_block_root_in_db(&self, block_root: &Hash256) -> Result<bool, Error> {
        match self.chain.get_block_by_root(*block_root) {
            Ok(_) => Ok(true),
            Err(ChainError::BlockNotFound) => Ok(false),
            Err(e) => Err(Error::Chain(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcc::codec::BccCodec;
    use bcc::message::GetBeaconBlocksMessage;
    use bcc::protocol::BccProtocol;
    use bcc::test_utils::CaptureTransport;
    use beacon_chain::test_utils::MemoryChain;
    use beacon_chain::ChainConfig;
    use sloggers::null::NullLoggerBuilder;
    use sloggers::Build;
    use ssz::Encode;
    use types::{AttestationData, BeaconBlockBody, Slot};

    const OFFSET: u16 = 16;

    fn logger() -> Logger {
        NullLoggerBuilder.build().expect("should build null logger")
    }

    fn codec() -> BccCodec {
        BccCodec::new(OFFSET, false)
    }

    struct TestPeer {
        remote: NodeId,
        peer: Arc<BccPeer>,
        transport: Arc<CaptureTransport>,
    }

    fn add_peer(pool: &BccPeerPool) -> TestPeer {
        let remote = NodeId::random();
        let transport = CaptureTransport::new();
        let protocol = BccProtocol::new(OFFSET, false, transport.clone(), logger());
        let peer = Arc::new(BccPeer::new(remote, protocol));
        peer.set_operational(true);
        pool.insert(peer.clone());
        TestPeer {
            remote,
            peer,
            transport,
        }
    }

    fn server_with_peers(
        chain: Arc<MemoryChain>,
        peer_count: usize,
    ) -> (BccReceiveServer<MemoryChain>, Vec<TestPeer>) {
        let peer_pool = Arc::new(BccPeerPool::new());
        let peers = (0..peer_count).map(|_| add_peer(&peer_pool)).collect();
        (BccReceiveServer::new(chain, peer_pool, logger()), peers)
    }

    fn attestation(slot: u64, seed: u64) -> Attestation {
        Attestation {
            aggregation_bits: vec![0b0000_0001],
            data: AttestationData {
                slot: Slot::new(slot),
                index: seed,
                beacon_block_root: Hash256::from_low_u64_be(seed),
            },
            signature: vec![0; 96],
        }
    }

    fn block(slot: u64, parent_root: Hash256, attestations: Vec<Attestation>) -> BeaconBlock {
        BeaconBlock {
            slot: Slot::new(slot),
            parent_root,
            state_root: Hash256::from_low_u64_be(slot),
            body: BeaconBlockBody { attestations },
        }
    }

    fn attestations_message(attestations: &[Attestation]) -> BccMessage {
        BccMessage::Attestations(AttestationsMessage {
            encoded_attestations: attestations.iter().map(|a| a.as_ssz_bytes()).collect(),
        })
    }

    fn new_block_message(block: &BeaconBlock) -> BccMessage {
        BccMessage::NewBeaconBlock(NewBeaconBlockMessage {
            encoded_block: block.as_ssz_bytes(),
        })
    }

    fn blocks_message(request_id: u64, blocks: &[BeaconBlock]) -> BccMessage {
        BccMessage::BeaconBlocks(BeaconBlocksMessage {
            request_id,
            encoded_blocks: blocks.iter().map(|b| b.as_ssz_bytes()).collect(),
        })
    }

    /// The `GetBeaconBlocks` frames captured on `peer`.
    fn captured_requests(peer: &TestPeer) -> Vec<GetBeaconBlocksMessage> {
        peer.transport
            .messages(&codec())
            .into_iter()
            .filter_map(|message| match message {
                BccMessage::GetBeaconBlocks(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn requests_and_resolves_orphan_ancestry() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let block_a = block(1, Hash256::from_low_u64_be(42), vec![]);
        chain.put_block(block_a.clone());

        let (mut server, peers) = server_with_peers(chain.clone(), 2);
        let block_b = block(2, block_a.signing_root(), vec![]);
        let block_c = block(3, block_b.signing_root(), vec![]);

        server
            .handle_message(peers[0].remote, new_block_message(&block_c))
            .expect("an orphan is accepted silently");

        assert!(server
            .orphan_block_pool
            .contains_root(&block_c.signing_root()));
        assert_eq!(server.pending_requests.len(), 2);
        // One parent request per connected peer and no broadcast of the
        // orphan itself.
        for peer in &peers {
            let requests = captured_requests(peer);
            assert_eq!(requests.len(), 1);
            assert_eq!(
                requests[0].block_slot_or_root,
                BlockSlotOrRoot::Root(block_b.signing_root())
            );
            assert_eq!(requests[0].max_blocks, 1);
            assert_eq!(peer.transport.frames().len(), 1);
        }

        let request_id = captured_requests(&peers[0])[0].request_id;
        peers[0].transport.clear();
        peers[1].transport.clear();

        server
            .handle_message(peers[0].remote, blocks_message(request_id, &[block_b.clone()]))
            .expect("the requested parent imports");

        assert!(chain.contains_block(&block_b.signing_root()));
        assert!(chain.contains_block(&block_c.signing_root()));
        assert!(server.orphan_block_pool.is_empty());
        assert!(!server.pending_requests.contains_key(&request_id));
        // Targeted fetches never fan back out.
        assert!(peers[0].transport.frames().is_empty());
        assert!(peers[1].transport.frames().is_empty());
    }

    #[test]
    fn imports_and_broadcasts_a_new_block_once() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let parent = block(1, Hash256::from_low_u64_be(7), vec![]);
        chain.put_block(parent.clone());

        let (mut server, peers) = server_with_peers(chain.clone(), 3);
        let block_x = block(2, parent.signing_root(), vec![]);

        server
            .handle_message(peers[0].remote, new_block_message(&block_x))
            .expect("a novel block imports");

        assert!(chain.contains_block(&block_x.signing_root()));
        assert!(peers[0].transport.frames().is_empty());
        for peer in &peers[1..] {
            assert_eq!(
                peer.transport.messages(&codec()),
                vec![new_block_message(&block_x)]
            );
        }

        peers[1].transport.clear();
        peers[2].transport.clear();
        let result = server.handle_message(peers[1].remote, new_block_message(&block_x));
        assert_eq!(result, Err(Error::DuplicateBlock(block_x.signing_root())));
        for peer in &peers {
            assert!(peer.transport.frames().is_empty());
        }
    }

    #[test]
    fn filters_seen_attestations_before_gossip() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let seen = attestation(5, 1);
        let fresh = attestation(5, 2);
        chain.add_known_attestation(seen.tree_hash_root());

        let (mut server, peers) = server_with_peers(chain, 2);
        server
            .handle_message(
                peers[0].remote,
                attestations_message(&[seen.clone(), fresh.clone()]),
            )
            .expect("valid attestations are accepted");

        assert_eq!(server.attestation_pool.len(), 1);
        assert!(server.attestation_pool.contains(&fresh));
        assert!(peers[0].transport.frames().is_empty());
        assert_eq!(
            peers[1].transport.messages(&codec()),
            vec![attestations_message(&[fresh])]
        );
    }

    #[test]
    fn drops_attestations_failing_validation() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let bad = attestation(5, 1);
        chain.mark_invalid_attestation(bad.tree_hash_root());

        let (mut server, peers) = server_with_peers(chain, 2);
        server
            .handle_message(peers[0].remote, attestations_message(&[bad]))
            .expect("invalid attestations are dropped silently");

        assert!(server.attestation_pool.is_empty());
        assert!(peers[1].transport.frames().is_empty());
    }

    #[test]
    fn pooled_attestations_are_not_rebroadcast() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let a = attestation(5, 1);
        let (mut server, peers) = server_with_peers(chain, 2);

        server
            .handle_message(peers[0].remote, attestations_message(&[a.clone()]))
            .expect("first delivery is accepted");
        peers[1].transport.clear();

        server
            .handle_message(peers[1].remote, attestations_message(&[a.clone()]))
            .expect("a repeat delivery is a no-op");
        assert_eq!(server.attestation_pool.len(), 1);
        assert!(peers[0].transport.frames().is_empty());
        assert!(peers[1].transport.frames().is_empty());
    }

    #[test]
    fn removes_included_attestations_on_import() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let parent = block(1, Hash256::from_low_u64_be(3), vec![]);
        chain.put_block(parent.clone());

        let a1 = attestation(1, 1);
        let a2 = attestation(1, 2);
        let a3 = attestation(1, 3);
        let (mut server, peers) = server_with_peers(chain, 1);
        server
            .attestation_pool
            .batch_add(vec![a1.clone(), a2.clone(), a3.clone()]);

        let block_x = block(2, parent.signing_root(), vec![a1, a3]);
        server
            .handle_message(peers[0].remote, new_block_message(&block_x))
            .expect("the block imports");

        assert_eq!(server.attestation_pool.get_all(), vec![a2]);
    }

    #[test]
    fn failed_orphan_import_sheds_its_attestations() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let block_a = block(1, Hash256::from_low_u64_be(3), vec![]);
        chain.put_block(block_a.clone());

        let a1 = attestation(1, 9);
        let block_c = block(2, block_a.signing_root(), vec![]);
        let block_d = block(3, block_c.signing_root(), vec![a1.clone()]);
        chain.mark_invalid_block(block_d.signing_root());

        let (mut server, peers) = server_with_peers(chain.clone(), 1);
        server.attestation_pool.add(a1);
        server.orphan_block_pool.add(block_d.clone());

        server
            .handle_message(peers[0].remote, new_block_message(&block_c))
            .expect("the parent imports");

        assert!(chain.contains_block(&block_c.signing_root()));
        assert!(!chain.contains_block(&block_d.signing_root()));
        assert!(server.orphan_block_pool.is_empty());
        // The rejected orphan's attestations are dropped from the pool too.
        assert!(server.attestation_pool.is_empty());
    }

    #[test]
    fn rejects_malformed_replies() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let block_a = block(1, Hash256::from_low_u64_be(5), vec![]);
        chain.put_block(block_a.clone());

        let (mut server, peers) = server_with_peers(chain, 1);
        let stray = block(9, Hash256::from_low_u64_be(6), vec![]);
        assert_eq!(
            server.handle_message(peers[0].remote, blocks_message(77, &[stray])),
            Err(Error::UnknownRequestId(77))
        );

        // Seed a pending request by receiving an orphan.
        let block_b = block(2, block_a.signing_root(), vec![]);
        let block_c = block(3, block_b.signing_root(), vec![]);
        server
            .handle_message(peers[0].remote, new_block_message(&block_c))
            .expect("the orphan is pooled");
        let request_id = captured_requests(&peers[0])[0].request_id;

        assert_eq!(
            server.handle_message(
                peers[0].remote,
                blocks_message(request_id, &[block_b.clone(), block_b.clone()]),
            ),
            Err(Error::UnexpectedBlockCount(2))
        );

        let wrong = block(2, Hash256::from_low_u64_be(8), vec![]);
        assert_eq!(
            server.handle_message(peers[0].remote, blocks_message(request_id, &[wrong.clone()])),
            Err(Error::BlockRootMismatch {
                expected: block_b.signing_root(),
                received: wrong.signing_root(),
            })
        );
        // Faulted replies leave the pending entry in place.
        assert!(server.pending_requests.contains_key(&request_id));
    }

    #[test]
    fn ignores_non_operational_peers() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let (mut server, peers) = server_with_peers(chain, 2);
        peers[0].peer.set_operational(false);

        server
            .handle_message(peers[0].remote, attestations_message(&[attestation(5, 1)]))
            .expect("messages from non-operational peers are dropped");

        assert!(server.attestation_pool.is_empty());
        assert!(peers[1].transport.frames().is_empty());
    }

    #[test]
    fn unknown_peers_are_dropped_silently() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let (mut server, _peers) = server_with_peers(chain, 1);

        server
            .handle_message(NodeId::random(), attestations_message(&[attestation(5, 1)]))
            .expect("messages from unknown peers are dropped");
        assert!(server.attestation_pool.is_empty());
    }

    #[test]
    fn unsubscribed_messages_are_an_invariant_failure() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        let (mut server, peers) = server_with_peers(chain, 1);

        let message = BccMessage::GetBeaconBlocks(GetBeaconBlocksMessage {
            request_id: 1,
            block_slot_or_root: BlockSlotOrRoot::Slot(Slot::new(1)),
            max_blocks: 1,
        });
        assert_eq!(
            server.handle_message(peers[0].remote, message),
            Err(Error::NotSubscribed("GetBeaconBlocks"))
        );
    }

    #[test]
    fn ready_attestations_respect_the_inclusion_window() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        chain.set_head_slot(Slot::new(40));
        let (mut server, _peers) = server_with_peers(chain, 0);

        let ready = attestation(39, 1);
        let premature = attestation(40, 2);
        let stale = attestation(7, 3);
        server
            .attestation_pool
            .batch_add(vec![ready.clone(), premature, stale]);

        assert_eq!(server.get_ready_attestations(), vec![ready]);
    }

    #[tokio::test]
    async fn serves_ready_attestations_over_the_channel() {
        let chain = Arc::new(MemoryChain::new(ChainConfig::default()));
        chain.set_head_slot(Slot::new(10));
        let (server, peers) = server_with_peers(chain, 1);

        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (signal, exit) = exit_future::signal();
        let handle = server.spawn(message_rx, exit);

        let ready = attestation(9, 1);
        message_tx
            .send(ReceiveMessage::Peer(
                peers[0].remote,
                attestations_message(&[ready.clone()]),
            ))
            .expect("the message should enqueue");

        let (reply_tx, reply_rx) = oneshot::channel();
        message_tx
            .send(ReceiveMessage::ReadyAttestations(reply_tx))
            .expect("the query should enqueue");
        assert_eq!(
            reply_rx.await.expect("the server should reply"),
            vec![ready]
        );

        let _ = signal.fire();
        handle.await.expect("server task should exit cleanly");
    }
}
