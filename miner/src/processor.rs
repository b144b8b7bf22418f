//! The single consumer of admitted block messages.
//!
//! Every round mutation driven by the network happens here, one message at a
//! time, in channel order.

use {
    crate::{chain::MinerChain, error::Result, message::BlockMessage},
    log::{debug, info, warn},
    std::{sync::Arc, time::Instant},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    zcn_node::{MinerStats, NodeId},
    zcn_round::{
        vrf::{seed_from_output, vrf_output},
        Block, BlockVerificationTicket, Notarization, Round, RoundError, RoundState, VrfShare,
    },
};

pub struct BlockMessageProcessor {
    chain: Arc<MinerChain>,
}

impl BlockMessageProcessor {
    pub fn new(chain: Arc<MinerChain>) -> Self {
        Self { chain }
    }

    pub async fn run(
        self,
        mut rx: mpsc::UnboundedReceiver<BlockMessage>,
        cancel: CancellationToken,
    ) {
        info!("block message processor started");
        loop {
            let msg = tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let kind = msg.kind();
            let sender = msg.sender().clone();
            if let Err(e) = self.process(msg).await {
                warn!("processing {kind} from {sender} failed: {e}");
            }
        }
        info!("block message processor stopped");
    }

    pub async fn process(&self, msg: BlockMessage) -> Result<()> {
        if self.chain.is_beyond_horizon(msg.round()) {
            debug!(
                "dropping {} for round {}: beyond horizon {}",
                msg.kind(),
                msg.round(),
                self.chain.round_horizon()
            );
            return Ok(());
        }
        match msg {
            BlockMessage::VrfShare { sender, share } => {
                self.handle_vrf_share(&sender, share);
                Ok(())
            }
            BlockMessage::Verify { sender, block } => {
                self.handle_verify_block(&sender, block);
                Ok(())
            }
            BlockMessage::VerificationTicket { sender, ticket } => {
                self.handle_verification_ticket(&sender, ticket).await
            }
            BlockMessage::Notarization { notarization, .. } => {
                self.handle_notarization(notarization).await
            }
            BlockMessage::NotarizedBlock { block, .. } => self.handle_notarized_block(block).await,
        }
    }

    // ── VRF ─────────────────────────────────────────────────────────────

    fn handle_vrf_share(&self, sender: &NodeId, share: VrfShare) {
        let mr = self.chain.get_or_create_round(share.round);
        mr.timeout_counter()
            .add_timeout_vote(share.round_timeout_count, sender.clone());

        if mr.has_random_seed() {
            mr.add_additional_vrf_share(share);
            return;
        }
        if mr.vrf_start_time().is_none() {
            mr.set_vrf_start_time(Instant::now());
        }

        let threshold = self.chain.vrf_threshold();
        if !mr.add_vrf_share(share, threshold) {
            return;
        }
        self.record_stats(sender, |s| s.vrf_shares = s.vrf_shares.saturating_add(1));

        if mr.vrf_share_count() >= threshold {
            self.compute_random_seed(&mr);
        }
    }

    fn compute_random_seed(&self, mr: &Round) {
        let number = mr.number();
        let prev_seed = self
            .chain
            .get_round(number.saturating_sub(1))
            .map_or(0, |prev| prev.random_seed());
        let output = vrf_output(prev_seed, &mr.vrf_shares());
        let seed = seed_from_output(&output);
        mr.set_vrf_output(output);

        let miners = self.chain.miners().size();
        if mr.set_random_seed(seed, miners) {
            let elapsed = mr
                .vrf_start_time()
                .map(|start| start.elapsed().as_millis())
                .unwrap_or_default();
            info!("round {number}: random seed {seed} from {} shares in {elapsed}ms", mr.vrf_share_count());
            self.chain.advance_current_round(number);
        }
    }

    // ── Proposals ───────────────────────────────────────────────────────

    fn handle_verify_block(&self, sender: &NodeId, block: Arc<Block>) {
        self.record_stats(sender, |s| {
            s.verification_requests = s.verification_requests.saturating_add(1)
        });

        let mr = self.chain.get_or_create_round(block.round());
        if mr.timeout_counter().set_timeout_count(block.round_timeout_count()) {
            debug!(
                "round {}: timeout count fast-forwarded to {} by block {}",
                mr.number(),
                block.round_timeout_count(),
                block.hash()
            );
        }

        if mr.is_ranks_computed() && !self.has_expected_rank(&mr, &block) {
            return;
        }

        let (_, added) = mr.add_proposed_block(block.clone());
        if added {
            mr.set_state(RoundState::CollectingProposals);
            debug!(
                "round {}: proposal {} of rank {} from {}",
                mr.number(),
                block.hash(),
                block.round_rank(),
                block.miner_id()
            );
        }
    }

    fn has_expected_rank(&self, mr: &Round, block: &Block) -> bool {
        let miners = self.chain.miners();
        let Some(generator) = miners.get(block.miner_id()) else {
            info!(
                "round {}: dropping block {} from non-miner {}",
                mr.number(),
                block.hash(),
                block.miner_id()
            );
            return false;
        };
        let Ok(rank) = mr.get_miner_rank(generator.set_index()) else {
            return false;
        };
        if usize::try_from(block.round_rank()).ok() != Some(rank) {
            info!(
                "round {}: dropping block {} with rank {}, expected {rank}",
                mr.number(),
                block.hash(),
                block.round_rank()
            );
            return false;
        }
        true
    }

    // ── Tickets and notarization ────────────────────────────────────────

    async fn handle_verification_ticket(
        &self,
        sender: &NodeId,
        ticket: BlockVerificationTicket,
    ) -> Result<()> {
        let Some(block) = self.proposed_block(ticket.round, &ticket.block_id) else {
            debug!(
                "round {}: ticket for unknown block {}",
                ticket.round, ticket.block_id
            );
            return Ok(());
        };
        if !block.add_verification_ticket(ticket.ticket) {
            return Ok(());
        }
        self.record_stats(sender, |s| {
            s.verification_tickets = s.verification_tickets.saturating_add(1)
        });
        self.notarize_if_ready(block).await
    }

    async fn handle_notarization(&self, notarization: Notarization) -> Result<()> {
        let Some(block) = self.proposed_block(notarization.round, &notarization.block_id) else {
            debug!(
                "round {}: notarization for unknown block {}",
                notarization.round, notarization.block_id
            );
            return Ok(());
        };
        block.merge_verification_tickets(&notarization.verification_tickets);
        self.notarize_if_ready(block).await
    }

    async fn handle_notarized_block(&self, block: Arc<Block>) -> Result<()> {
        if block.round_random_seed() == 0 {
            return Err(RoundError::BlockHasNoSeed {
                round: block.round(),
                hash: block.hash().to_string(),
            }
            .into());
        }
        let mr = self.chain.get_or_create_round(block.round());
        if mr.random_seed() != block.round_random_seed() {
            mr.set_random_seed_for_notarized_block(
                block.round_random_seed(),
                self.chain.miners().size(),
            );
        }
        mr.timeout_counter()
            .set_timeout_count(block.round_timeout_count());
        self.notarize(&mr, block).await
    }

    fn proposed_block(&self, round: i64, hash: &str) -> Option<Arc<Block>> {
        self.chain
            .get_round(round)?
            .proposed_blocks()
            .into_iter()
            .find(|b| b.hash() == hash)
    }

    async fn notarize_if_ready(&self, block: Arc<Block>) -> Result<()> {
        if block.is_notarized() || block.ticket_count() < self.chain.notarization_threshold() {
            return Ok(());
        }
        let mr = self.chain.get_or_create_round(block.round());
        self.notarize(&mr, block).await
    }

    /// Notarize `block` in `mr`, open the next round and finalize the
    /// previous one.
    async fn notarize(&self, mr: &Arc<Round>, block: Arc<Block>) -> Result<()> {
        let (block, added) = mr.add_notarized_block(block)?;
        if !added {
            return Ok(());
        }
        self.record_stats(block.miner_id(), |s| {
            s.notarized_blocks = s.notarized_blocks.saturating_add(1)
        });

        let number = mr.number();
        let next = number.saturating_add(1);
        self.chain.advance_current_round(next);
        self.chain.get_or_create_round(next);
        self.finalize_round(number.saturating_sub(1)).await
    }

    async fn finalize_round(&self, number: i64) -> Result<()> {
        if number <= self.chain.latest_finalized_round() {
            return Ok(());
        }
        let Some(mr) = self.chain.get_round(number) else {
            return Ok(());
        };
        let Some(best) = mr.get_best_ranked_notarized_block() else {
            debug!("round {number}: nothing notarized to finalize");
            return Ok(());
        };
        if !mr.set_finalizing() {
            return Ok(());
        }
        mr.finalize(best.clone());
        self.record_stats(best.miner_id(), |s| {
            s.finalized_blocks = s.finalized_blocks.saturating_add(1)
        });
        info!("round {number}: finalizing block {} of rank {}", best.hash(), best.round_rank());
        self.chain.push_finalized_round(mr).await
    }

    fn record_stats(&self, id: &NodeId, f: impl FnOnce(&mut MinerStats)) {
        if let Some(node) = self.chain.registry().get(id) {
            node.update_miner_stats(f);
        }
    }
}
