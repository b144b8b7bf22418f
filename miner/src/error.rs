//! Error types for the miner.

use {
    crate::config::ConfigError,
    thiserror::Error,
    zcn_node::{NodeError, NodeId},
    zcn_round::RoundError,
};

/// Errors raised while routing, processing or finalizing rounds.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Transport, codec or registry failure.
    #[error(transparent)]
    Node(#[from] NodeError),

    /// Round engine rejected an operation.
    #[error(transparent)]
    Round(#[from] RoundError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A message came from a node we do not know.
    #[error("message from unknown sender {0}")]
    UnknownSender(NodeId),

    /// The sender's role does not allow this message.
    #[error("{sender} may not send {uri}")]
    UnexpectedRole { sender: NodeId, uri: &'static str },

    /// A notarized block request named neither a round nor a hash.
    #[error("no block hash or round number provided")]
    EmptyBlockRequest,

    /// The requested notarized block is not held locally.
    #[error("block not available: round {round:?}, hash {hash:?}")]
    BlockNotAvailable {
        round: Option<i64>,
        hash: Option<String>,
    },

    /// An internal channel was closed.
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    /// The finalization collaborator failed.
    #[error("finalizing round {round} failed: {reason}")]
    Finalize { round: i64, reason: String },

    /// The round-info store failed.
    #[error("storing round info failed: {0}")]
    Store(String),
}

/// Convenience result type for miner operations.
pub type Result<T> = std::result::Result<T, MinerError>;
