//! Admission of inbound miner-to-miner messages.
//!
//! Network reception is concurrent; the router only decides whether a
//! message is worth processing and, if so, pushes it onto the single
//! block-message channel.  All round mutations happen in the processor.

use {
    crate::{
        chain::MinerChain,
        error::{MinerError, Result},
        message::{
            BlockMessage, Envelope, LfbTicket, N2NEntity, NotarizedBlockRequest, LFB_TICKET_URI,
        },
        sender::EntitySender,
    },
    log::{debug, info, warn},
    std::sync::Arc,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    zcn_node::{transport::InboundFrame, Node, NodeType},
    zcn_round::{Block, BlockData, BlockVerificationTicket, Notarization, StateStatus, VrfShare},
};

pub struct BlockMessageRouter {
    chain: Arc<MinerChain>,
    sender: Arc<dyn EntitySender>,
}

impl BlockMessageRouter {
    pub fn new(chain: Arc<MinerChain>, sender: Arc<dyn EntitySender>) -> Self {
        Self { chain, sender }
    }

    /// Decode and dispatch inbound frames until cancelled or the transport
    /// closes.
    pub async fn serve(self, mut inbound: mpsc::Receiver<InboundFrame>, cancel: CancellationToken) {
        info!("block message router started");
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = inbound.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            let envelope = match Envelope::decode(&frame.frame) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("undecodable frame from {}: {e}", frame.from);
                    continue;
                }
            };
            if let Err(e) = self.dispatch(envelope) {
                warn!("rejected message from {}: {e}", frame.from);
            }
        }
        info!("block message router stopped");
    }

    /// Route one message from a known sender.
    pub fn dispatch(&self, envelope: Envelope) -> Result<()> {
        let Some(from) = self.chain.registry().get(&envelope.sender) else {
            return Err(MinerError::UnknownSender(envelope.sender));
        };
        from.record_received();

        match &envelope.entity {
            N2NEntity::NotarizedBlockRequest(_) | N2NEntity::LfbTicket(_) => {}
            entity => {
                if let Some(round) = entity.round().filter(|r| self.chain.is_beyond_horizon(*r)) {
                    debug!(
                        "dropping {} for round {round} from {}: beyond horizon {}",
                        entity.uri(),
                        from.id(),
                        self.chain.round_horizon()
                    );
                    return Ok(());
                }
            }
        }

        match envelope.entity {
            N2NEntity::VrfShare(share) => self.handle_vrf_share(&from, share),
            N2NEntity::VerifyBlock(data) => self.handle_verify_block(&from, data),
            N2NEntity::VerificationTicket(ticket) => self.handle_verification_ticket(&from, ticket),
            N2NEntity::Notarization(notarization) => self.handle_notarization(&from, notarization),
            N2NEntity::NotarizedBlock(data) => self.handle_notarized_block(&from, data),
            N2NEntity::NotarizedBlockRequest(request) => {
                self.handle_notarized_block_request(&from, request)
            }
            N2NEntity::LfbTicket(ticket) => self.handle_lfb_ticket(&from, ticket),
        }
    }

    fn handle_vrf_share(&self, from: &Arc<Node>, share: VrfShare) -> Result<()> {
        let bound = self.chain.vrf_staleness_bound();
        if share.round < bound {
            info!(
                "rejecting vrf share from {}: round {} below {bound} (lfb ticket {}, lfb {})",
                from.id(),
                share.round,
                self.chain.lfb_ticket_round(),
                self.chain.latest_finalized_round()
            );
            return Ok(());
        }

        if share.round < self.chain.current_round() {
            self.push_to_lagging_miner(from, share.round);
            return Ok(());
        }

        let sender = from.id().clone();
        let share = share.with_party(sender.clone());
        self.chain
            .push_block_message(BlockMessage::VrfShare { sender, share })
    }

    /// `from` is still sharing for `round`, which we have moved past.  Send
    /// it our notarized block of that round so it can catch up.  The sends
    /// run detached and their outcome is only logged.
    fn push_to_lagging_miner(&self, from: &Arc<Node>, round: i64) {
        let Some(mr) = self.chain.get_round(round) else {
            info!("rejecting vrf share: missing round {round}");
            return;
        };
        let Some(block) = mr.best_block().filter(|b| b.is_notarized()) else {
            info!("rejecting vrf share: no notarized block for round {round}");
            return;
        };
        if block.state_status() != StateStatus::Successful {
            info!(
                "rejecting vrf share: state of block {} in round {round} not computed",
                block.hash()
            );
            return;
        }
        let Some(to) = self.chain.miners().get(from.id()).cloned() else {
            info!("rejecting vrf share: {} not a miner of round {round}", from.id());
            return;
        };

        info!(
            "pushing notarized block {} of round {round} to lagging miner {} at {}",
            block.hash(),
            to.id(),
            to.n2n_addr()
        );
        let sender = self.sender.clone();
        let data = block.to_data();
        tokio::spawn(async move {
            let verify = N2NEntity::VerifyBlock(data.clone());
            if let Err(e) = sender.send_to(&to, &verify).await {
                debug!("catch-up verify to {} failed: {e}", to.id());
            }
            let notarized = N2NEntity::NotarizedBlock(data);
            if let Err(e) = sender.send_to(&to, &notarized).await {
                debug!("catch-up notarized block to {} failed: {e}", to.id());
            }
        });
    }

    fn handle_verify_block(&self, from: &Arc<Node>, data: BlockData) -> Result<()> {
        if data.miner_id == *self.chain.self_id() {
            debug!("ignoring own block {} for verification", data.hash);
            return Ok(());
        }
        self.chain.push_block_message(BlockMessage::Verify {
            sender: from.id().clone(),
            block: Arc::new(Block::from(data)),
        })
    }

    fn handle_verification_ticket(
        &self,
        from: &Arc<Node>,
        ticket: BlockVerificationTicket,
    ) -> Result<()> {
        self.chain
            .push_block_message(BlockMessage::VerificationTicket {
                sender: from.id().clone(),
                ticket,
            })
    }

    fn handle_notarization(&self, from: &Arc<Node>, notarization: Notarization) -> Result<()> {
        let lfb_round = self.chain.latest_finalized_round();
        if notarization.round < lfb_round {
            debug!(
                "dropping notarization of round {} below finalized round {lfb_round}",
                notarization.round
            );
            return Ok(());
        }
        self.chain.push_block_message(BlockMessage::Notarization {
            sender: from.id().clone(),
            notarization,
        })
    }

    fn handle_notarized_block(&self, from: &Arc<Node>, data: BlockData) -> Result<()> {
        self.chain.push_block_message(BlockMessage::NotarizedBlock {
            sender: from.id().clone(),
            block: Arc::new(Block::from(data)),
        })
    }

    /// Answer with the requested notarized block, sent back to the
    /// requester as a [`N2NEntity::NotarizedBlock`].
    fn handle_notarized_block_request(
        &self,
        from: &Arc<Node>,
        request: NotarizedBlockRequest,
    ) -> Result<()> {
        let block = self
            .chain
            .get_notarized_block(request.round, request.hash.as_deref())?;
        debug!(
            "serving notarized block {} of round {} to {}",
            block.hash(),
            block.round(),
            from.id()
        );
        let sender = self.sender.clone();
        let to = from.clone();
        let data = block.to_data();
        tokio::spawn(async move {
            if let Err(e) = sender.send_to(&to, &N2NEntity::NotarizedBlock(data)).await {
                debug!("notarized block response to {} failed: {e}", to.id());
            }
        });
        Ok(())
    }

    /// Latest-finalized-block tickets come from sharders only.
    fn handle_lfb_ticket(&self, from: &Arc<Node>, ticket: LfbTicket) -> Result<()> {
        if from.node_type() != NodeType::Sharder {
            return Err(MinerError::UnexpectedRole {
                sender: from.id().clone(),
                uri: LFB_TICKET_URI,
            });
        }
        if self.chain.update_lfb_ticket(from.id(), ticket.round) {
            debug!(
                "lfb ticket round {} ({}) from {}",
                ticket.round,
                ticket.lfb_hash,
                from.id()
            );
        }
        Ok(())
    }
}
