//! Per-round consensus state.
//!
//! A [`Round`] is touched concurrently by the message processor, the
//! finalization worker and local callers.  `state` and the random seed are
//! atomics so that the frequent state reads never wait on the lock guarding
//! the block lists and VRF shares.  The timeout counter has its own lock.

use {
    crate::{
        block::{Block, BlockState},
        config::RoundConfig,
        error::{Result, RoundError},
        permutation::permutation,
        timeout_counter::TimeoutCounter,
        types::{RoundState, VrfShare},
    },
    log::{debug, error, info, warn},
    parking_lot::RwLock,
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU8, Ordering},
            Arc,
        },
        time::Instant,
    },
    zcn_node::{Node, NodeId},
};

#[derive(Debug, Default)]
struct RoundData {
    /// Rank of each miner, indexed by set index.
    miner_perm: Option<Vec<usize>>,
    /// Ascending by rank, ties in arrival order.
    proposed: Vec<Arc<Block>>,
    /// Descending by chain weight.
    notarized: Vec<Arc<Block>>,
    shares: HashMap<NodeId, VrfShare>,
    /// Best notarized block so far; the finalized block once finalized.
    block: Option<Arc<Block>>,
    block_hash: Option<String>,
    vrf_output: String,
    vrf_start_time: Option<Instant>,
}

/// Consensus state of a single round.
#[derive(Debug)]
pub struct Round {
    number: i64,
    random_seed: AtomicI64,
    has_random_seed: AtomicBool,
    state: AtomicU8,
    soft_timeout_count: AtomicU32,
    data: RwLock<RoundData>,
    timeout_counter: TimeoutCounter,
}

impl Round {
    pub fn new(number: i64, self_id: NodeId, config: &RoundConfig) -> Self {
        Self {
            number,
            random_seed: AtomicI64::new(0),
            has_random_seed: AtomicBool::new(false),
            state: AtomicU8::new(RoundState::ShareVrf as u8),
            soft_timeout_count: AtomicU32::new(0),
            data: RwLock::new(RoundData::default()),
            timeout_counter: TimeoutCounter::new(self_id, config.timeout_cap),
        }
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn timeout_counter(&self) -> &TimeoutCounter {
        &self.timeout_counter
    }

    // ── Random seed and ranks ───────────────────────────────────────────

    /// Set the round's seed and compute the miner ranks, once.
    ///
    /// Returns true only for the call that set the seed.  A zero seed
    /// clears the seed and the ranks instead.
    pub fn set_random_seed(&self, seed: i64, miners: usize) -> bool {
        if seed == 0 {
            self.clear_random_seed();
            return false;
        }
        if self
            .has_random_seed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.data.write().miner_perm = Some(permutation(seed, miners));
        self.random_seed.store(seed, Ordering::Release);
        self.set_state(RoundState::VrfComplete);
        debug!("round {} seeded with {seed} for {miners} miners", self.number);
        true
    }

    /// Force the seed carried by a notarized block, recomputing the ranks
    /// even if the round already had a seed.
    pub fn set_random_seed_for_notarized_block(&self, seed: i64, miners: usize) {
        if seed == 0 {
            self.clear_random_seed();
            return;
        }
        self.has_random_seed.store(true, Ordering::Release);
        self.data.write().miner_perm = Some(permutation(seed, miners));
        self.random_seed.store(seed, Ordering::Release);
    }

    fn clear_random_seed(&self) {
        self.data.write().miner_perm = None;
        self.random_seed.store(0, Ordering::Release);
        self.has_random_seed.store(false, Ordering::Release);
    }

    pub fn random_seed(&self) -> i64 {
        self.random_seed.load(Ordering::Acquire)
    }

    pub fn has_random_seed(&self) -> bool {
        self.random_seed() != 0
    }

    pub fn is_ranks_computed(&self) -> bool {
        self.data.read().miner_perm.is_some()
    }

    /// Rank of the miner at `set_index`.
    ///
    /// Asking before the ranks exist is a sequencing bug and is logged as
    /// an error.  An index past the permutation means the miner set grew
    /// mid-round.
    pub fn get_miner_rank(&self, set_index: usize) -> Result<usize> {
        let data = self.data.read();
        let Some(perm) = data.miner_perm.as_ref() else {
            error!(
                "miner ranks not computed yet: state {}, seed {}, round {}",
                self.state(),
                self.random_seed(),
                self.number
            );
            return Err(RoundError::PermutationNotComputed { round: self.number });
        };
        match perm.get(set_index) {
            Some(&rank) => Ok(rank),
            None => {
                warn!(
                    "round {}: set index {set_index} missing from permutation of {}",
                    self.number,
                    perm.len()
                );
                Err(RoundError::RankIndexOutOfRange {
                    index: set_index,
                    len: perm.len(),
                })
            }
        }
    }

    /// `nodes` ordered best rank first.  Nodes outside the permutation sort
    /// last.
    pub fn get_miners_by_rank(&self, mut nodes: Vec<Arc<Node>>) -> Vec<Arc<Node>> {
        let data = self.data.read();
        let perm = data.miner_perm.as_deref().unwrap_or_default();
        nodes.sort_by_key(|n| match perm.get(n.set_index()) {
            Some(&rank) => rank,
            None => {
                warn!(
                    "round {}: node {} (set index {}) missing from permutation",
                    self.number,
                    n.id(),
                    n.set_index()
                );
                usize::MAX
            }
        });
        nodes
    }

    // ── Blocks ──────────────────────────────────────────────────────────

    /// Add a proposal.  On a duplicate hash the stored block is returned
    /// with `false`.
    pub fn add_proposed_block(&self, block: Arc<Block>) -> (Arc<Block>, bool) {
        add_proposed(&mut self.data.write(), block)
    }

    /// Add a block that reached notarization.
    ///
    /// A block already notarized under the same hash absorbs the incoming
    /// tickets and is returned with `false`.  A different notarized block of
    /// the same rank is evicted.
    pub fn add_notarized_block(&self, block: Arc<Block>) -> Result<(Arc<Block>, bool)> {
        if block.round_random_seed() == 0 {
            return Err(RoundError::BlockHasNoSeed {
                round: block.round(),
                hash: block.hash().to_string(),
            });
        }

        let mut data = self.data.write();
        add_proposed(&mut data, block.clone());

        let mut same_rank = None;
        for (i, existing) in data.notarized.iter().enumerate() {
            if existing.hash() == block.hash() {
                if !Arc::ptr_eq(existing, &block) {
                    existing.merge_verification_tickets(&block.verification_tickets());
                }
                debug!(
                    "round {}: block {} already notarized, merged tickets",
                    block.round(),
                    block.hash()
                );
                return Ok((existing.clone(), false));
            }
            if existing.round_rank() == block.round_rank() {
                same_rank = Some(i);
            }
        }

        if let Some(i) = same_rank {
            let evicted = data.notarized.remove(i);
            info!(
                "round {}: replacing notarized block {} (seed {}, timeouts {}, miner {}) of rank {}",
                self.number,
                evicted.hash(),
                evicted.round_random_seed(),
                evicted.round_timeout_count(),
                evicted.miner_id(),
                evicted.round_rank()
            );
        }

        block.set_notarized();
        block.set_block_state(BlockState::Notarized);

        let better = data
            .block
            .as_ref()
            .is_none_or(|best| best.round_rank() > block.round_rank());
        if better {
            data.block = Some(block.clone());
        }

        data.notarized.push(block.clone());
        data.notarized
            .sort_by(|a, b| b.chain_weight().total_cmp(&a.chain_weight()));
        debug!("round {}: reached notarization of {}", block.round(), block.hash());
        Ok((block, true))
    }

    /// Replace the stored block with the same hash in both lists.
    pub fn update_notarized_block(&self, block: Arc<Block>) {
        let mut guard = self.data.write();
        let data = &mut *guard;
        for slot in data.proposed.iter_mut().chain(data.notarized.iter_mut()) {
            if slot.hash() == block.hash() {
                *slot = block.clone();
            }
        }
    }

    pub fn proposed_blocks(&self) -> Vec<Arc<Block>> {
        self.data.read().proposed.clone()
    }

    pub fn notarized_blocks(&self) -> Vec<Arc<Block>> {
        self.data.read().notarized.clone()
    }

    pub fn get_best_ranked_proposed_block(&self) -> Option<Arc<Block>> {
        best_ranked(&self.data.read().proposed)
    }

    pub fn get_heaviest_notarized_block(&self) -> Option<Arc<Block>> {
        self.data.read().notarized.first().cloned()
    }

    pub fn get_best_ranked_notarized_block(&self) -> Option<Arc<Block>> {
        best_ranked(&self.data.read().notarized)
    }

    /// Best notarized block so far, or the finalized block.
    pub fn best_block(&self) -> Option<Arc<Block>> {
        self.data.read().block.clone()
    }

    /// Hash of the finalized block.
    pub fn block_hash(&self) -> Option<String> {
        self.data.read().block_hash.clone()
    }

    // ── VRF shares ──────────────────────────────────────────────────────

    /// Accept a share from a party that has none yet, unless `threshold`
    /// shares are already in.
    pub fn add_vrf_share(&self, share: VrfShare, threshold: usize) -> bool {
        let mut data = self.data.write();
        if data.shares.len() >= threshold {
            debug!("round {}: already at vrf threshold {threshold}", self.number);
            return false;
        }
        self.insert_share(&mut data, share)
    }

    /// Record a share past the threshold; kept for statistics only.
    pub fn add_additional_vrf_share(&self, share: VrfShare) -> bool {
        let mut data = self.data.write();
        self.insert_share(&mut data, share)
    }

    fn insert_share(&self, data: &mut RoundData, share: VrfShare) -> bool {
        let Some(party) = share.party.clone() else {
            warn!("round {}: vrf share without party", self.number);
            return false;
        };
        if data.shares.contains_key(&party) {
            debug!("round {}: vrf share from {party} already recorded", self.number);
            return false;
        }
        self.set_state(RoundState::ShareVrf);
        data.shares.insert(party, share);
        true
    }

    pub fn vrf_share_exists(&self, party: &NodeId) -> bool {
        self.data.read().shares.contains_key(party)
    }

    pub fn vrf_shares(&self) -> Vec<VrfShare> {
        self.data.read().shares.values().cloned().collect()
    }

    pub fn vrf_share_count(&self) -> usize {
        self.data.read().shares.len()
    }

    pub fn set_vrf_output(&self, output: String) {
        self.data.write().vrf_output = output;
    }

    pub fn vrf_output(&self) -> String {
        self.data.read().vrf_output.clone()
    }

    pub fn set_vrf_start_time(&self, at: Instant) {
        self.data.write().vrf_start_time = Some(at);
    }

    pub fn vrf_start_time(&self) -> Option<Instant> {
        self.data.read().vrf_start_time
    }

    // ── State ───────────────────────────────────────────────────────────

    pub fn state(&self) -> RoundState {
        RoundState::try_from(self.state.load(Ordering::Acquire)).unwrap_or(RoundState::ShareVrf)
    }

    /// Move to `state` if it is ahead of the current state.
    pub fn set_state(&self, state: RoundState) {
        self.state.fetch_max(state as u8, Ordering::AcqRel);
    }

    /// Set `state` unconditionally.
    pub fn reset_state(&self, state: RoundState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Claim finalization of this round.  Fails if the round is already
    /// finalizing or finalized.
    pub fn set_finalizing(&self) -> bool {
        let _guard = self.data.write();
        if self.is_finalized() || self.is_finalizing() {
            return false;
        }
        self.set_state(RoundState::Finalizing);
        true
    }

    /// Finalize the round on `block`.
    pub fn finalize(&self, block: Arc<Block>) {
        let mut data = self.data.write();
        self.set_state(RoundState::Finalized);
        data.block_hash = Some(block.hash().to_string());
        data.block = Some(block);
    }

    pub fn is_finalizing(&self) -> bool {
        self.state() == RoundState::Finalizing
    }

    /// Round 0 is always finalized.
    pub fn is_finalized(&self) -> bool {
        self.state() == RoundState::Finalized || self.number == 0
    }

    /// Drop blocks, shares, seed and ranks and start over from
    /// [`RoundState::ShareVrf`].  Timeout votes are left alone.
    pub fn restart(&self) {
        {
            let mut data = self.data.write();
            data.proposed.clear();
            data.notarized.clear();
            data.shares.clear();
            data.miner_perm = None;
            data.block = None;
            data.block_hash = None;
        }
        self.random_seed.store(0, Ordering::Release);
        self.has_random_seed.store(false, Ordering::Release);
        self.soft_timeout_count.store(0, Ordering::Release);
        self.reset_state(RoundState::ShareVrf);
    }

    pub fn inc_soft_timeout_count(&self) {
        self.soft_timeout_count.fetch_add(1, Ordering::AcqRel);
    }

    pub fn soft_timeout_count(&self) -> u32 {
        self.soft_timeout_count.load(Ordering::Acquire)
    }
}

fn add_proposed(data: &mut RoundData, block: Arc<Block>) -> (Arc<Block>, bool) {
    if let Some(existing) = data.proposed.iter().find(|b| b.hash() == block.hash()) {
        return (existing.clone(), false);
    }
    data.proposed.push(block.clone());
    data.proposed.sort_by_key(|b| b.round_rank());
    (block, true)
}

fn best_ranked(blocks: &[Arc<Block>]) -> Option<Arc<Block>> {
    blocks.iter().min_by_key(|b| b.round_rank()).cloned()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{block::tests::test_block, types::VerificationTicket},
        assert_matches::assert_matches,
        std::{net::SocketAddr, thread},
        zcn_node::{NodeInfo, NodeType},
    };

    fn round(number: i64) -> Round {
        Round::new(number, NodeId::from("self"), &RoundConfig::default())
    }

    fn share(party: &str) -> VrfShare {
        VrfShare::new(5, 0, format!("share-{party}")).with_party(NodeId::from(party))
    }

    fn miner(id: &str, set_index: usize) -> Arc<Node> {
        Arc::new(Node::new(NodeInfo {
            id: NodeId::from(id),
            node_type: NodeType::Miner,
            n2n_addr: SocketAddr::from(([127, 0, 0, 1], 7171)),
            set_index,
            description: String::new(),
        }))
    }

    // ── Seed ────────────────────────────────────────────────────────────

    #[test]
    fn test_set_random_seed_once() {
        let r = round(5);
        assert!(r.set_random_seed(77, 4));
        let ranks: Vec<usize> = (0..4).map(|i| r.get_miner_rank(i).unwrap()).collect();
        assert!(!r.set_random_seed(77, 4));
        assert!(!r.set_random_seed(99, 4));
        assert_eq!(r.random_seed(), 77);
        let again: Vec<usize> = (0..4).map(|i| r.get_miner_rank(i).unwrap()).collect();
        assert_eq!(ranks, again);
        assert_eq!(r.state(), RoundState::VrfComplete);
    }

    #[test]
    fn test_zero_seed_clears() {
        let r = round(5);
        assert!(r.set_random_seed(77, 3));
        assert!(!r.set_random_seed(0, 3));
        assert!(!r.has_random_seed());
        assert!(!r.is_ranks_computed());
        assert!(r.set_random_seed(78, 3));
        assert_eq!(r.random_seed(), 78);
    }

    #[test]
    fn test_seed_for_notarized_block_overrides() {
        let r = round(5);
        r.set_random_seed(77, 3);
        r.set_random_seed_for_notarized_block(88, 3);
        assert_eq!(r.random_seed(), 88);
        assert_eq!(
            (0..3).map(|i| r.get_miner_rank(i).unwrap()).collect::<Vec<_>>(),
            permutation(88, 3)
        );
    }

    #[test]
    fn test_rank_errors() {
        let r = round(5);
        assert_matches!(
            r.get_miner_rank(0),
            Err(RoundError::PermutationNotComputed { round: 5 })
        );
        r.set_random_seed(1, 2);
        assert_matches!(
            r.get_miner_rank(2),
            Err(RoundError::RankIndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_miners_by_rank() {
        let r = round(5);
        r.set_random_seed(31, 3);
        let nodes = vec![miner("a", 0), miner("b", 1), miner("c", 2), miner("late", 9)];
        let ordered = r.get_miners_by_rank(nodes);
        let ranks: Vec<usize> = ordered[..3]
            .iter()
            .map(|n| r.get_miner_rank(n.set_index()).unwrap())
            .collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(ordered[3].id(), &NodeId::from("late"));
    }

    // ── Proposals ───────────────────────────────────────────────────────

    #[test]
    fn test_proposed_first_writer_wins() {
        let r = round(5);
        let first = test_block(5, "m1", 2, 1.0, 7);
        let (stored, added) = r.add_proposed_block(first.clone());
        assert!(added);
        assert!(Arc::ptr_eq(&stored, &first));

        let dup = test_block(5, "m1", 2, 1.0, 7);
        let (stored, added) = r.add_proposed_block(dup);
        assert!(!added);
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(r.proposed_blocks().len(), 1);
    }

    #[test]
    fn test_proposed_sorted_by_rank() {
        let r = round(5);
        r.add_proposed_block(test_block(5, "m3", 3, 1.0, 7));
        r.add_proposed_block(test_block(5, "m1", 1, 1.0, 7));
        r.add_proposed_block(test_block(5, "m2", 2, 1.0, 7));
        let ranks: Vec<i32> = r.proposed_blocks().iter().map(|b| b.round_rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(r.get_best_ranked_proposed_block().unwrap().round_rank(), 1);
    }

    // ── Notarization ────────────────────────────────────────────────────

    #[test]
    fn test_notarized_requires_seed() {
        let r = round(5);
        let block = test_block(5, "m1", 0, 1.0, 0);
        assert_matches!(
            r.add_notarized_block(block),
            Err(RoundError::BlockHasNoSeed { round: 5, .. })
        );
        assert!(r.notarized_blocks().is_empty());
        assert!(r.proposed_blocks().is_empty());
    }

    #[test]
    fn test_notarized_merges_tickets() {
        let r = round(5);
        let a = test_block(5, "m1", 0, 1.0, 7);
        a.add_verification_ticket(VerificationTicket::new("v1", "s1"));
        let b = test_block(5, "m1", 0, 1.0, 7);
        b.add_verification_ticket(VerificationTicket::new("v2", "s2"));

        let (_, added) = r.add_notarized_block(a.clone()).unwrap();
        assert!(added);
        let (stored, added) = r.add_notarized_block(b).unwrap();
        assert!(!added);
        assert!(Arc::ptr_eq(&stored, &a));
        assert_eq!(r.notarized_blocks().len(), 1);
        assert_eq!(stored.ticket_count(), 2);
        assert!(stored.is_notarized());
        assert_eq!(stored.block_state(), BlockState::Notarized);
    }

    #[test]
    fn test_rank_collision_evicts_older() {
        let r = round(5);
        let first = test_block(5, "m1", 1, 1.0, 7);
        let second = test_block(5, "m2", 1, 2.0, 7);
        r.add_notarized_block(first).unwrap();
        r.add_notarized_block(second.clone()).unwrap();
        let notarized = r.notarized_blocks();
        assert_eq!(notarized.len(), 1);
        assert_eq!(notarized[0].hash(), second.hash());
        assert_eq!(r.proposed_blocks().len(), 2);
    }

    #[test]
    fn test_best_block_never_regresses() {
        let r = round(5);
        let ranks = [3, 1, 4, 0, 2, 5];
        let mut best = i32::MAX;
        for (i, rank) in ranks.iter().enumerate() {
            let block = test_block(5, &format!("m{i}"), *rank, i as f64, 7);
            r.add_notarized_block(block).unwrap();
            let current = r.best_block().unwrap().round_rank();
            assert!(current <= best);
            best = current;
        }
        assert_eq!(best, 0);
        assert_eq!(r.get_best_ranked_notarized_block().unwrap().round_rank(), 0);
    }

    #[test]
    fn test_heaviest_notarized() {
        let r = round(5);
        r.add_notarized_block(test_block(5, "m1", 0, 1.0, 7)).unwrap();
        r.add_notarized_block(test_block(5, "m2", 1, 9.0, 7)).unwrap();
        r.add_notarized_block(test_block(5, "m3", 2, 4.0, 7)).unwrap();
        let heaviest = r.get_heaviest_notarized_block().unwrap();
        assert_eq!(heaviest.miner_id(), &NodeId::from("m2"));
        let weights: Vec<f64> = r.notarized_blocks().iter().map(|b| b.chain_weight()).collect();
        assert_eq!(weights, vec![9.0, 4.0, 1.0]);
    }

    #[test]
    fn test_update_notarized_block() {
        let r = round(5);
        let old = test_block(5, "m1", 0, 1.0, 7);
        r.add_notarized_block(old.clone()).unwrap();
        let fresh = test_block(5, "m1", 0, 1.0, 7);
        r.update_notarized_block(fresh.clone());
        assert!(Arc::ptr_eq(&r.proposed_blocks()[0], &fresh));
        assert!(Arc::ptr_eq(&r.notarized_blocks()[0], &fresh));
    }

    #[test]
    fn test_concurrent_notarizations_single_entry() {
        zcn_logger::setup();
        let r = Arc::new(round(5));
        thread::scope(|s| {
            for i in 0..8 {
                let r = r.clone();
                s.spawn(move || {
                    let block = test_block(5, "m1", 0, 1.0, 7);
                    block.add_verification_ticket(VerificationTicket::new(
                        format!("v{i}"),
                        "sig",
                    ));
                    r.add_notarized_block(block).unwrap();
                });
            }
        });
        let notarized = r.notarized_blocks();
        assert_eq!(notarized.len(), 1);
        assert_eq!(notarized[0].ticket_count(), 8);
    }

    // ── VRF shares ──────────────────────────────────────────────────────

    #[test]
    fn test_vrf_share_threshold() {
        let r = round(5);
        assert!(r.add_vrf_share(share("p1"), 3));
        assert!(r.add_vrf_share(share("p2"), 3));
        assert_eq!(r.state(), RoundState::ShareVrf);
        assert!(!r.add_vrf_share(share("p1"), 3));
        assert!(r.add_vrf_share(share("p3"), 3));
        assert!(!r.add_vrf_share(share("p4"), 3));
        assert_eq!(r.vrf_share_count(), 3);
        assert!(r.vrf_share_exists(&NodeId::from("p3")));
        assert!(!r.vrf_share_exists(&NodeId::from("p4")));

        assert!(r.add_additional_vrf_share(share("p4")));
        assert!(!r.add_additional_vrf_share(share("p4")));
        assert_eq!(r.vrf_share_count(), 4);
    }

    #[test]
    fn test_vrf_share_without_party_rejected() {
        let r = round(5);
        assert!(!r.add_vrf_share(VrfShare::new(5, 0, "x"), 3));
        assert_eq!(r.vrf_share_count(), 0);
    }

    // ── State ───────────────────────────────────────────────────────────

    #[test]
    fn test_state_never_rewinds() {
        let r = round(5);
        r.set_state(RoundState::CollectingProposals);
        r.set_state(RoundState::VrfComplete);
        assert_eq!(r.state(), RoundState::CollectingProposals);
        assert!(r.add_vrf_share(share("late"), 3));
        assert_eq!(r.state(), RoundState::CollectingProposals);
        r.reset_state(RoundState::Generating);
        assert_eq!(r.state(), RoundState::Generating);
    }

    #[test]
    fn test_set_finalizing_once() {
        let r = round(5);
        assert!(r.set_finalizing());
        assert!(!r.set_finalizing());
        assert!(r.is_finalizing());

        let block = test_block(5, "m1", 0, 1.0, 7);
        r.finalize(block.clone());
        assert!(r.is_finalized());
        assert!(!r.set_finalizing());
        assert_eq!(r.block_hash().as_deref(), Some(block.hash()));
    }

    #[test]
    fn test_round_zero_is_finalized() {
        let r = round(0);
        assert!(r.is_finalized());
        assert!(!r.set_finalizing());
    }

    #[test]
    fn test_restart() {
        let r = round(5);
        r.set_random_seed(7, 3);
        r.add_vrf_share(share("p1"), 3);
        r.add_notarized_block(test_block(5, "m1", 0, 1.0, 7)).unwrap();
        r.inc_soft_timeout_count();
        r.timeout_counter().add_timeout_vote(3, NodeId::from("p1"));
        r.set_state(RoundState::Generated);

        r.restart();
        assert_eq!(r.state(), RoundState::ShareVrf);
        assert!(!r.has_random_seed());
        assert!(!r.is_ranks_computed());
        assert!(r.proposed_blocks().is_empty());
        assert!(r.notarized_blocks().is_empty());
        assert!(r.best_block().is_none());
        assert_eq!(r.vrf_share_count(), 0);
        assert_eq!(r.soft_timeout_count(), 0);
        assert_eq!(r.timeout_counter().vote_count(), 1);
        assert!(r.set_random_seed(8, 3));
    }
}
