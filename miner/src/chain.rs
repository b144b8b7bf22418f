//! Chain bookkeeping shared by the router, the processor and the
//! finalization worker.
//!
//! Round numbers are tracked in atomics and only move forward.  Rounds live
//! in a concurrent map keyed by number and are pruned once they fall more
//! than `round_window` rounds behind the latest finalized round.

use {
    crate::{
        config::MinerConfig,
        error::{MinerError, Result},
        message::BlockMessage,
    },
    dashmap::DashMap,
    log::{debug, info},
    parking_lot::RwLock,
    std::sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    tokio::sync::mpsc,
    zcn_node::{NodeId, NodePool, NodeRegistry},
    zcn_round::{Block, Round},
};

/// Finalized rounds waiting for the finalization worker.
const FINALIZED_ROUNDS_BUFFER: usize = 16;

/// Receiving halves of the channels created with a [`MinerChain`].
pub struct ChainReceivers {
    pub block_messages: mpsc::UnboundedReceiver<BlockMessage>,
    pub finalized_rounds: mpsc::Receiver<Arc<Round>>,
}

pub struct MinerChain {
    self_id: NodeId,
    config: MinerConfig,
    registry: Arc<NodeRegistry>,
    miners: RwLock<Arc<NodePool>>,
    rounds: DashMap<i64, Arc<Round>>,
    current_round: AtomicI64,
    latest_finalized_round: AtomicI64,
    latest_finalized_block: RwLock<Option<Arc<Block>>>,
    lfb_ticket_round: AtomicI64,
    block_messages: mpsc::UnboundedSender<BlockMessage>,
    finalized_rounds: mpsc::Sender<Arc<Round>>,
}

impl MinerChain {
    /// Create the chain and register the miners of `miners` in `registry`.
    pub fn new(
        self_id: NodeId,
        config: MinerConfig,
        registry: Arc<NodeRegistry>,
        miners: NodePool,
    ) -> (Arc<Self>, ChainReceivers) {
        let (block_tx, block_rx) = mpsc::unbounded_channel();
        let (finalized_tx, finalized_rx) = mpsc::channel(FINALIZED_ROUNDS_BUFFER);
        registry.register_all(miners.iter().cloned());

        let chain = Arc::new(Self {
            self_id,
            config,
            registry,
            miners: RwLock::new(Arc::new(miners)),
            rounds: DashMap::new(),
            current_round: AtomicI64::new(0),
            latest_finalized_round: AtomicI64::new(0),
            latest_finalized_block: RwLock::new(None),
            lfb_ticket_round: AtomicI64::new(0),
            block_messages: block_tx,
            finalized_rounds: finalized_tx,
        });
        let receivers = ChainReceivers {
            block_messages: block_rx,
            finalized_rounds: finalized_rx,
        };
        (chain, receivers)
    }

    pub fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    // ── Miner set ───────────────────────────────────────────────────────

    /// Current miner pool.  The returned pool never changes.
    pub fn miners(&self) -> Arc<NodePool> {
        self.miners.read().clone()
    }

    /// Swap in a new miner pool, registering its nodes.
    pub fn set_miners(&self, miners: NodePool) {
        self.registry.register_all(miners.iter().cloned());
        info!("miner pool updated: {} miners", miners.size());
        *self.miners.write() = Arc::new(miners);
    }

    pub fn vrf_threshold(&self) -> usize {
        self.config.round.vrf_threshold(self.miners().size())
    }

    pub fn notarization_threshold(&self) -> usize {
        self.config.round.notarization_threshold(self.miners().size())
    }

    // ── Rounds ──────────────────────────────────────────────────────────

    pub fn get_round(&self, number: i64) -> Option<Arc<Round>> {
        self.rounds.get(&number).map(|r| r.value().clone())
    }

    pub fn get_or_create_round(&self, number: i64) -> Arc<Round> {
        self.rounds
            .entry(number)
            .or_insert_with(|| {
                debug!("creating round {number}");
                Arc::new(Round::new(number, self.self_id.clone(), &self.config.round))
            })
            .value()
            .clone()
    }

    /// Restart a round for a retry, creating it if needed.
    pub fn restart_round(&self, number: i64) -> Arc<Round> {
        let round = self.get_or_create_round(number);
        round.restart();
        info!("round {number} restarted");
        round
    }

    /// Highest round accepted from the network: `round_window` rounds past
    /// the current round.
    pub fn round_horizon(&self) -> i64 {
        self.current_round()
            .saturating_add(self.config.round_window)
    }

    pub fn is_beyond_horizon(&self, round: i64) -> bool {
        round > self.round_horizon()
    }

    /// A notarized block by hash, optionally within `round`, or else the
    /// heaviest notarized block of `round`.
    pub fn get_notarized_block(&self, round: Option<i64>, hash: Option<&str>) -> Result<Arc<Block>> {
        let not_available = || MinerError::BlockNotAvailable {
            round,
            hash: hash.map(str::to_string),
        };
        match (round, hash) {
            (None, None) => Err(MinerError::EmptyBlockRequest),
            (Some(number), None) => self
                .get_round(number)
                .and_then(|r| r.get_heaviest_notarized_block())
                .ok_or_else(not_available),
            (round, Some(hash)) => {
                let find = |r: &Round| r.notarized_blocks().into_iter().find(|b| b.hash() == hash);
                let found = match round {
                    Some(number) => self.get_round(number).and_then(|r| find(r.as_ref())),
                    None => self.rounds.iter().find_map(|r| find(r.value().as_ref())),
                };
                found.ok_or_else(not_available)
            }
        }
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Drop rounds more than `round_window` behind the latest finalized
    /// round.  Returns how many were dropped.
    pub fn prune_rounds(&self) -> usize {
        let keep_from = self
            .latest_finalized_round()
            .saturating_sub(self.config.round_window);
        let before = self.rounds.len();
        self.rounds.retain(|number, _| *number >= keep_from);
        let pruned = before.saturating_sub(self.rounds.len());
        if pruned > 0 {
            debug!("pruned {pruned} rounds below {keep_from}");
        }
        pruned
    }

    // ── Round numbers ───────────────────────────────────────────────────

    pub fn current_round(&self) -> i64 {
        self.current_round.load(Ordering::Acquire)
    }

    /// Move the current round forward to `number`.  Returns false if the
    /// chain is already there or beyond.
    pub fn advance_current_round(&self, number: i64) -> bool {
        let previous = self.current_round.fetch_max(number, Ordering::AcqRel);
        if previous < number {
            info!("current round {previous} -> {number}");
            true
        } else {
            false
        }
    }

    pub fn latest_finalized_round(&self) -> i64 {
        self.latest_finalized_round.load(Ordering::Acquire)
    }

    pub fn latest_finalized_block(&self) -> Option<Arc<Block>> {
        self.latest_finalized_block.read().clone()
    }

    /// Record `block` as finalized if it is newer than the current latest
    /// finalized block.
    pub fn set_latest_finalized_block(&self, block: Arc<Block>) -> bool {
        let mut lfb = self.latest_finalized_block.write();
        if lfb.as_ref().is_some_and(|b| b.round() >= block.round()) {
            return false;
        }
        self.latest_finalized_round
            .fetch_max(block.round(), Ordering::AcqRel);
        info!("latest finalized block {} at round {}", block.hash(), block.round());
        *lfb = Some(block);
        true
    }

    pub fn lfb_ticket_round(&self) -> i64 {
        self.lfb_ticket_round.load(Ordering::Acquire)
    }

    /// Record a latest-finalized-block ticket from `sharder`.
    pub fn update_lfb_ticket(&self, sharder: &NodeId, round: i64) -> bool {
        if let Some(node) = self.registry.get(sharder) {
            node.update_sharder_stats(|stats| {
                stats.lfb_tickets = stats.lfb_tickets.saturating_add(1);
                stats.latest_ticket_round = stats.latest_ticket_round.max(round);
            });
        }
        self.lfb_ticket_round.fetch_max(round, Ordering::AcqRel) < round
    }

    /// Shares for rounds below this bound are obsolete.
    pub fn vrf_staleness_bound(&self) -> i64 {
        self.lfb_ticket_round().min(self.latest_finalized_round())
    }

    // ── Channels ────────────────────────────────────────────────────────

    pub fn push_block_message(&self, message: BlockMessage) -> Result<()> {
        self.block_messages
            .send(message)
            .map_err(|_| MinerError::ChannelClosed("block message"))
    }

    pub async fn push_finalized_round(&self, round: Arc<Round>) -> Result<()> {
        self.finalized_rounds
            .send(round)
            .await
            .map_err(|_| MinerError::ChannelClosed("finalized round"))
    }
}
