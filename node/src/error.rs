//! Error types for the node layer.

use {crate::node::NodeId, thiserror::Error};

/// Errors that can occur while tracking nodes or moving frames between them.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Failed to encode or decode a binary frame payload.
    #[error("binary codec error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Failed to encode or decode a JSON frame payload.
    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame header named a codec we do not know.
    #[error("unknown codec tag: {0}")]
    UnknownCodec(u8),

    /// Frame is shorter than its header.
    #[error("truncated frame: {0} bytes")]
    TruncatedFrame(usize),

    /// Message exceeds the maximum allowed size.
    #[error("message too large: {size} bytes (max {max} bytes)")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The node is not known to the registry or pool.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Transport-level I/O error.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A send did not complete within its timeout class.
    #[error("send timeout after {0}ms")]
    Timeout(u64),
}

/// Convenience result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
