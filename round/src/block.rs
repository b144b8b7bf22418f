//! Blocks as seen by the round engine.
//!
//! A [`Block`] is shared as `Arc<Block>` between the proposed and notarized
//! lists of a round and whoever else holds it.  Identity fields never change
//! after construction; the ticket set, the notarization flag and the two
//! status fields are interior-mutable so that merging a duplicate
//! notarization never needs a second copy of the block.

use {
    crate::types::VerificationTicket,
    parking_lot::RwLock,
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
    std::sync::atomic::{AtomicBool, AtomicU8, Ordering},
    zcn_node::NodeId,
};

/// Verification progress of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockState {
    Generated = 0,
    Verifying = 1,
    Verified = 2,
    VerificationFailed = 3,
    Notarized = 4,
}

impl BlockState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => BlockState::Verifying,
            2 => BlockState::Verified,
            3 => BlockState::VerificationFailed,
            4 => BlockState::Notarized,
            _ => BlockState::Generated,
        }
    }
}

/// Status of the block's state computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum StateStatus {
    Pending = 0,
    Computing = 1,
    Computed = 2,
    Successful = 3,
    Failed = 4,
}

impl StateStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => StateStatus::Computing,
            2 => StateStatus::Computed,
            3 => StateStatus::Successful,
            4 => StateStatus::Failed,
            _ => StateStatus::Pending,
        }
    }
}

/// Serialized form of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub hash: String,
    pub round: i64,
    pub miner_id: NodeId,
    pub prev_hash: String,
    pub round_rank: i32,
    pub chain_weight: f64,
    pub round_random_seed: i64,
    pub round_timeout_count: u32,
    #[serde(default)]
    pub verification_tickets: Vec<VerificationTicket>,
}

/// A block together with its mutable consensus bookkeeping.
#[derive(Debug)]
pub struct Block {
    hash: String,
    round: i64,
    miner_id: NodeId,
    prev_hash: String,
    round_rank: i32,
    chain_weight: f64,
    round_random_seed: i64,
    round_timeout_count: u32,
    tickets: RwLock<Vec<VerificationTicket>>,
    notarized: AtomicBool,
    block_state: AtomicU8,
    state_status: AtomicU8,
}

impl Block {
    /// Hash of the identity fields, hex encoded.
    pub fn compute_hash(
        round: i64,
        miner_id: &NodeId,
        prev_hash: &str,
        round_random_seed: i64,
        round_timeout_count: u32,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(round.to_le_bytes());
        hasher.update(miner_id.as_str().as_bytes());
        hasher.update(prev_hash.as_bytes());
        hasher.update(round_random_seed.to_le_bytes());
        hasher.update(round_timeout_count.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn round(&self) -> i64 {
        self.round
    }

    pub fn miner_id(&self) -> &NodeId {
        &self.miner_id
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn round_rank(&self) -> i32 {
        self.round_rank
    }

    pub fn chain_weight(&self) -> f64 {
        self.chain_weight
    }

    pub fn round_random_seed(&self) -> i64 {
        self.round_random_seed
    }

    pub fn round_timeout_count(&self) -> u32 {
        self.round_timeout_count
    }

    // ── Verification tickets ────────────────────────────────────────────

    pub fn verification_tickets(&self) -> Vec<VerificationTicket> {
        self.tickets.read().clone()
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.read().len()
    }

    /// Add a ticket unless its verifier already has one.
    pub fn add_verification_ticket(&self, ticket: VerificationTicket) -> bool {
        let mut tickets = self.tickets.write();
        if tickets.iter().any(|t| t.verifier_id == ticket.verifier_id) {
            return false;
        }
        tickets.push(ticket);
        true
    }

    /// Union `incoming` into this block's tickets, one per verifier.
    /// Returns the number of tickets added.
    pub fn merge_verification_tickets(&self, incoming: &[VerificationTicket]) -> usize {
        let mut tickets = self.tickets.write();
        let mut added = 0usize;
        for ticket in incoming {
            if tickets.iter().any(|t| t.verifier_id == ticket.verifier_id) {
                continue;
            }
            tickets.push(ticket.clone());
            added = added.saturating_add(1);
        }
        added
    }

    // ── Status ──────────────────────────────────────────────────────────

    pub fn set_notarized(&self) {
        self.notarized.store(true, Ordering::Release);
    }

    pub fn is_notarized(&self) -> bool {
        self.notarized.load(Ordering::Acquire)
    }

    pub fn set_block_state(&self, state: BlockState) {
        self.block_state.store(state as u8, Ordering::Release);
    }

    pub fn block_state(&self) -> BlockState {
        BlockState::from_u8(self.block_state.load(Ordering::Acquire))
    }

    pub fn set_state_status(&self, status: StateStatus) {
        self.state_status.store(status as u8, Ordering::Release);
    }

    pub fn state_status(&self) -> StateStatus {
        StateStatus::from_u8(self.state_status.load(Ordering::Acquire))
    }

    /// Wire form, carrying the current ticket set.
    pub fn to_data(&self) -> BlockData {
        BlockData {
            hash: self.hash.clone(),
            round: self.round,
            miner_id: self.miner_id.clone(),
            prev_hash: self.prev_hash.clone(),
            round_rank: self.round_rank,
            chain_weight: self.chain_weight,
            round_random_seed: self.round_random_seed,
            round_timeout_count: self.round_timeout_count,
            verification_tickets: self.verification_tickets(),
        }
    }
}

impl From<BlockData> for Block {
    fn from(data: BlockData) -> Self {
        Self {
            hash: data.hash,
            round: data.round,
            miner_id: data.miner_id,
            prev_hash: data.prev_hash,
            round_rank: data.round_rank,
            chain_weight: data.chain_weight,
            round_random_seed: data.round_random_seed,
            round_timeout_count: data.round_timeout_count,
            tickets: RwLock::new(data.verification_tickets),
            notarized: AtomicBool::new(false),
            block_state: AtomicU8::new(BlockState::Generated as u8),
            state_status: AtomicU8::new(StateStatus::Pending as u8),
        }
    }
}

impl From<&Block> for BlockData {
    fn from(block: &Block) -> Self {
        block.to_data()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use {super::*, std::sync::Arc};

    /// A block of `round` by `miner` with the given rank, weight and seed.
    pub(crate) fn test_block(
        round: i64,
        miner: &str,
        rank: i32,
        chain_weight: f64,
        seed: i64,
    ) -> Arc<Block> {
        let miner_id = NodeId::from(miner);
        let hash = Block::compute_hash(round, &miner_id, "prev", seed, 0);
        Arc::new(Block::from(BlockData {
            hash,
            round,
            miner_id,
            prev_hash: "prev".into(),
            round_rank: rank,
            chain_weight,
            round_random_seed: seed,
            round_timeout_count: 0,
            verification_tickets: Vec::new(),
        }))
    }

    #[test]
    fn test_hash_depends_on_identity() {
        let m = NodeId::from("m1");
        let h1 = Block::compute_hash(1, &m, "p", 7, 0);
        let h2 = Block::compute_hash(1, &m, "p", 7, 1);
        assert_ne!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_eq!(h1, Block::compute_hash(1, &m, "p", 7, 0));
    }

    #[test]
    fn test_merge_tickets_is_union() {
        let block = test_block(1, "m1", 0, 1.0, 7);
        assert!(block.add_verification_ticket(VerificationTicket::new("a", "sa")));
        assert!(!block.add_verification_ticket(VerificationTicket::new("a", "other")));
        let added = block.merge_verification_tickets(&[
            VerificationTicket::new("a", "sa"),
            VerificationTicket::new("b", "sb"),
            VerificationTicket::new("c", "sc"),
        ]);
        assert_eq!(added, 2);
        assert_eq!(block.ticket_count(), 3);
        assert_eq!(block.merge_verification_tickets(&block.verification_tickets()), 0);
    }

    #[test]
    fn test_status_flags() {
        let block = test_block(1, "m1", 0, 1.0, 7);
        assert!(!block.is_notarized());
        assert_eq!(block.block_state(), BlockState::Generated);
        assert_eq!(block.state_status(), StateStatus::Pending);
        block.set_notarized();
        block.set_block_state(BlockState::Notarized);
        block.set_state_status(StateStatus::Successful);
        assert!(block.is_notarized());
        assert_eq!(block.block_state(), BlockState::Notarized);
        assert_eq!(block.state_status(), StateStatus::Successful);
    }

    #[test]
    fn test_data_carries_tickets() {
        let block = test_block(2, "m1", 1, 3.5, 9);
        block.add_verification_ticket(VerificationTicket::new("v", "s"));
        let data = BlockData::from(block.as_ref());
        assert_eq!(data.verification_tickets.len(), 1);
        let back = Block::from(data);
        assert_eq!(back.hash(), block.hash());
        assert_eq!(back.ticket_count(), 1);
        assert!(!back.is_notarized());
    }
}
