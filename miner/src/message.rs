//! Miner-to-miner messages.
//!
//! [`Envelope`] is what travels between miners: the sender's identity plus
//! one [`N2NEntity`].  Each entity has a fixed endpoint URI and fixed
//! [`SendOptions`]; the URI keys the sender's per-endpoint livemetrics.
//!
//! [`BlockMessage`] is the internal form pushed by the router onto the
//! block-message channel once a message has been admitted.

use {
    crate::error::Result,
    serde::{Deserialize, Serialize},
    std::sync::Arc,
    zcn_node::{
        codec::{self, Codec},
        MessageClass, NodeId,
    },
    zcn_round::{Block, BlockData, BlockVerificationTicket, Notarization, VrfShare},
};

// ── Endpoints ───────────────────────────────────────────────────────────────

pub const VRF_SHARE_URI: &str = "/v1/_m2m/round/vrf_share";
pub const VERIFY_BLOCK_URI: &str = "/v1/_m2m/block/verify";
pub const VERIFICATION_TICKET_URI: &str = "/v1/_m2m/block/verification_ticket";
pub const NOTARIZATION_URI: &str = "/v1/_m2m/block/notarization";
pub const NOTARIZED_BLOCK_URI: &str = "/v1/_m2m/block/notarized_block";
pub const NOTARIZED_BLOCK_GET_URI: &str = "/v1/_x2m/block/notarized_block/get";
pub const LFB_TICKET_URI: &str = "/v1/_s2m/block/latest_finalized_ticket";

/// Timeout class and codec used to send an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub class: MessageClass,
    pub codec: Codec,
}

// ── Wire entities ───────────────────────────────────────────────────────────

/// A sharder's attestation of the latest round it has finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfbTicket {
    pub round: i64,
    pub lfb_hash: String,
}

/// Ask a miner for a notarized block, by hash or by round.  With a hash the
/// block must be notarized; with only a round the heaviest notarized block
/// of that round is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarizedBlockRequest {
    pub round: Option<i64>,
    pub hash: Option<String>,
}

/// A consensus entity sent between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum N2NEntity {
    VrfShare(VrfShare),
    VerifyBlock(BlockData),
    VerificationTicket(BlockVerificationTicket),
    Notarization(Notarization),
    NotarizedBlock(BlockData),
    NotarizedBlockRequest(NotarizedBlockRequest),
    LfbTicket(LfbTicket),
}

impl N2NEntity {
    pub fn uri(&self) -> &'static str {
        match self {
            N2NEntity::VrfShare(_) => VRF_SHARE_URI,
            N2NEntity::VerifyBlock(_) => VERIFY_BLOCK_URI,
            N2NEntity::VerificationTicket(_) => VERIFICATION_TICKET_URI,
            N2NEntity::Notarization(_) => NOTARIZATION_URI,
            N2NEntity::NotarizedBlock(_) => NOTARIZED_BLOCK_URI,
            N2NEntity::NotarizedBlockRequest(_) => NOTARIZED_BLOCK_GET_URI,
            N2NEntity::LfbTicket(_) => LFB_TICKET_URI,
        }
    }

    /// Blocks go as large binary messages, shares and tickets as small JSON,
    /// notarizations as small binary.
    pub fn send_options(&self) -> SendOptions {
        let (class, codec) = match self {
            N2NEntity::VrfShare(_)
            | N2NEntity::VerificationTicket(_)
            | N2NEntity::NotarizedBlockRequest(_)
            | N2NEntity::LfbTicket(_) => (MessageClass::Small, Codec::Json),
            N2NEntity::VerifyBlock(_) | N2NEntity::NotarizedBlock(_) => {
                (MessageClass::Large, Codec::Bincode)
            }
            N2NEntity::Notarization(_) => (MessageClass::Small, Codec::Bincode),
        };
        SendOptions { class, codec }
    }

    pub fn round(&self) -> Option<i64> {
        match self {
            N2NEntity::VrfShare(share) => Some(share.round),
            N2NEntity::VerifyBlock(block) | N2NEntity::NotarizedBlock(block) => Some(block.round),
            N2NEntity::VerificationTicket(ticket) => Some(ticket.round),
            N2NEntity::Notarization(notarization) => Some(notarization.round),
            N2NEntity::NotarizedBlockRequest(request) => request.round,
            N2NEntity::LfbTicket(ticket) => Some(ticket.round),
        }
    }
}

/// An entity together with the identity of the node that sent it.
///
/// `sender` is declared by the sender itself.  The transport is expected to
/// authenticate the connection so that it can be trusted; the router only
/// checks that the id is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: NodeId,
    pub entity: N2NEntity,
}

impl Envelope {
    pub fn new(sender: NodeId, entity: N2NEntity) -> Self {
        Self { sender, entity }
    }

    /// Frame the envelope with the entity's codec.
    pub fn encode(&self, max_message_size: usize) -> Result<Vec<u8>> {
        let codec = self.entity.send_options().codec;
        Ok(codec::encode_framed(self, codec, max_message_size)?)
    }

    /// Decode a frame produced by [`Envelope::encode`].
    pub fn decode(frame: &[u8]) -> Result<Self> {
        Ok(codec::decode_frame(frame)?)
    }
}

// ── Internal block messages ─────────────────────────────────────────────────

/// An admitted message waiting for the block-message processor.
#[derive(Debug, Clone)]
pub enum BlockMessage {
    VrfShare {
        sender: NodeId,
        share: VrfShare,
    },
    Verify {
        sender: NodeId,
        block: Arc<Block>,
    },
    VerificationTicket {
        sender: NodeId,
        ticket: BlockVerificationTicket,
    },
    Notarization {
        sender: NodeId,
        notarization: Notarization,
    },
    NotarizedBlock {
        sender: NodeId,
        block: Arc<Block>,
    },
}

impl BlockMessage {
    pub fn sender(&self) -> &NodeId {
        match self {
            BlockMessage::VrfShare { sender, .. }
            | BlockMessage::Verify { sender, .. }
            | BlockMessage::VerificationTicket { sender, .. }
            | BlockMessage::Notarization { sender, .. }
            | BlockMessage::NotarizedBlock { sender, .. } => sender,
        }
    }

    pub fn round(&self) -> i64 {
        match self {
            BlockMessage::VrfShare { share, .. } => share.round,
            BlockMessage::Verify { block, .. } | BlockMessage::NotarizedBlock { block, .. } => {
                block.round()
            }
            BlockMessage::VerificationTicket { ticket, .. } => ticket.round,
            BlockMessage::Notarization { notarization, .. } => notarization.round,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BlockMessage::VrfShare { .. } => "vrf_share",
            BlockMessage::Verify { .. } => "verify",
            BlockMessage::VerificationTicket { .. } => "verification_ticket",
            BlockMessage::Notarization { .. } => "notarization",
            BlockMessage::NotarizedBlock { .. } => "notarized_block",
        }
    }
}
