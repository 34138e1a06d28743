//! Serves inbound `GetBeaconBlocks` requests from the canonical chain.

use bcc::events::{GetBeaconBlocksEvent, SendBeaconBlocksEvent};
use bcc::message::GetBeaconBlocksMessage;
use bcc::peer::NodeId;
use bcc::protocol::ProxyBccProtocol;
use bcc::BlockSlotOrRoot;
use beacon_chain::{BeaconChain, ChainError};
use slog::{crit, debug, warn, Logger};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use types::BeaconBlock;

#[derive(Debug)]
pub enum Error {
    /// The chain database failed in a way that is not a simple miss.
    Chain(ChainError),
    /// The reply could not be handed to the event bus.
    Protocol(bcc::protocol::Error),
}

impl Error {
    fn is_fatal(&self) -> bool {
        matches!(self, Error::Chain(_))
    }
}

/// Replies to `GetBeaconBlocks` with a connected run of canonical blocks.
///
/// Runs isolated from the peer pool: requests arrive over the event bus and
/// replies leave through a per-request proxy driver.
pub struct BccRequestServer<C> {
    chain: Arc<C>,
    event_tx: mpsc::UnboundedSender<SendBeaconBlocksEvent>,
    log: Logger,
}

impl<C: BeaconChain + 'static> BccRequestServer<C> {
    pub fn new(
        chain: Arc<C>,
        event_tx: mpsc::UnboundedSender<SendBeaconBlocksEvent>,
        log: Logger,
    ) -> Self {
        Self {
            chain,
            event_tx,
            log,
        }
    }

    /// Consumes request events until `exit` fires or the channel closes.
    pub fn spawn(
        self,
        mut event_rx: mpsc::UnboundedReceiver<GetBeaconBlocksEvent>,
        exit: exit_future::Exit,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::pin!(exit);
            loop {
                tokio::select! {
                    _ = &mut exit => {
                        debug!(self.log, "Request server shutting down");
                        break;
                    }
                    event = event_rx.recv() => match event {
                        Some(event) => {
                            match self.handle_get_beacon_blocks(event.remote, event.message) {
                                Ok(()) => {}
                                Err(e) if e.is_fatal() => {
                                    crit!(
                                        self.log, "Request server failed";
                                        "error" => format!("{:?}", e),
                                    );
                                    break;
                                }
                                Err(e) => warn!(
                                    self.log, "Failed to reply to block request";
                                    "error" => format!("{:?}", e),
                                ),
                            }
                        }
                        None => break,
                    }
                }
            }
        })
    }

    /// Resolves the start block and replies with a walk of the canonical
    /// chain. An unknown start yields an empty reply rather than an error:
    /// the miss may simply be a race with a reorg.
    pub fn handle_get_beacon_blocks(
        &self,
        remote: NodeId,
        message: GetBeaconBlocksMessage,
    ) -> Result<(), Error> {
        let peer = ProxyBccProtocol::new(remote, self.event_tx.clone());
        let GetBeaconBlocksMessage {
            request_id,
            block_slot_or_root,
            max_blocks,
        } = message;

        let start_block = match block_slot_or_root {
            BlockSlotOrRoot::Slot(slot) => self.chain.get_canonical_block_by_slot(slot),
            BlockSlotOrRoot::Root(root) => self.chain.get_block_by_root(root),
        };

        let blocks = match start_block {
            Ok(start_block) => {
                debug!(
                    self.log, "Blocks requested";
                    "peer" => format!("{}", remote),
                    "start_slot" => start_block.slot.as_u64(),
                    "max_blocks" => max_blocks,
                );
                self.get_blocks(start_block, max_blocks)?
            }
            Err(ChainError::BlockNotFound) => {
                debug!(
                    self.log, "Unknown block requested";
                    "peer" => format!("{}", remote),
                );
                Vec::new()
            }
            Err(e) => return Err(Error::Chain(e)),
        };

        debug!(
            self.log, "Replying with blocks";
            "peer" => format!("{}", remote),
            "request_id" => request_id,
            "count" => blocks.len(),
        );
        peer.send_blocks(&blocks, request_id).map_err(Error::Protocol)
    }

    /// Walks forward from `start_block`, keeping only a connected prefix:
    /// the canonical chain can change mid-walk and peers must receive a
    /// chain, not a set.
    fn get_blocks(
        &self,
        start_block: BeaconBlock,
        max_blocks: u64,
    ) -> Result<Vec<BeaconBlock>, Error> {
        if max_blocks == 0 {
            return Ok(Vec::new());
        }

        let start_slot = start_block.slot;
        let mut parent = start_block;
        let mut blocks = vec![parent.clone()];
        for offset in 1..max_blocks {
            match self.chain.get_canonical_block_by_slot(start_slot + offset) {
                Ok(block) => {
                    if block.parent_root != parent.signing_root() {
                        break;
                    }
                    blocks.push(block.clone());
                    parent = block;
                }
                Err(ChainError::BlockNotFound) => break,
                Err(e) => return Err(Error::Chain(e)),
            }
        }
        Ok(blocks)
    }
}
