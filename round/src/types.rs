//! Round states and the small consensus entities exchanged between miners.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
    zcn_node::NodeId,
};

// ── Round state ─────────────────────────────────────────────────────────────

/// Progress of a round.  States only move forward; see
/// [`crate::Round::set_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoundState {
    ShareVrf = 0,
    VrfComplete = 1,
    Generating = 2,
    Generated = 3,
    CollectingProposals = 4,
    VerificationTimedOut = 5,
    Finalizing = 6,
    Finalized = 7,
}

impl TryFrom<u8> for RoundState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => RoundState::ShareVrf,
            1 => RoundState::VrfComplete,
            2 => RoundState::Generating,
            3 => RoundState::Generated,
            4 => RoundState::CollectingProposals,
            5 => RoundState::VerificationTimedOut,
            6 => RoundState::Finalizing,
            7 => RoundState::Finalized,
            other => return Err(other),
        })
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundState::ShareVrf => "share_vrf",
            RoundState::VrfComplete => "vrf_complete",
            RoundState::Generating => "generating",
            RoundState::Generated => "generated",
            RoundState::CollectingProposals => "collecting_proposals",
            RoundState::VerificationTimedOut => "verification_timed_out",
            RoundState::Finalizing => "finalizing",
            RoundState::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

// ── VRF ─────────────────────────────────────────────────────────────────────

/// One miner's contribution to a round's random seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfShare {
    pub round: i64,
    /// Timeout count the sender was at when it produced the share.
    pub round_timeout_count: u32,
    /// Opaque share payload.
    pub share: String,
    /// The contributing miner.  Filled from the sender identity on receipt,
    /// never trusted from the payload.
    #[serde(skip)]
    pub party: Option<NodeId>,
}

impl VrfShare {
    pub fn new(round: i64, round_timeout_count: u32, share: impl Into<String>) -> Self {
        Self {
            round,
            round_timeout_count,
            share: share.into(),
            party: None,
        }
    }

    pub fn with_party(mut self, party: NodeId) -> Self {
        self.party = Some(party);
        self
    }
}

// ── Tickets and notarizations ───────────────────────────────────────────────

/// A verifier's signature over a block hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationTicket {
    pub verifier_id: NodeId,
    pub signature: String,
}

impl VerificationTicket {
    pub fn new(verifier_id: impl Into<NodeId>, signature: impl Into<String>) -> Self {
        Self {
            verifier_id: verifier_id.into(),
            signature: signature.into(),
        }
    }
}

/// A verification ticket together with the block it is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockVerificationTicket {
    pub block_id: String,
    pub round: i64,
    #[serde(flatten)]
    pub ticket: VerificationTicket,
}

/// Proof that a block collected enough verification tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notarization {
    pub block_id: String,
    pub round: i64,
    pub verification_tickets: Vec<VerificationTicket>,
}
