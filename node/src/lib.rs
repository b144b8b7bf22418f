//! zcn node layer
//!
//! Everything a miner needs to know about its peers and to move bytes
//! between them:
//!
//! - **Node registry**: every known miner and sharder, owned by the caller
//!   and shared as `Arc<NodeRegistry>`; readers take snapshots, writers swap
//!   in a new map.
//! - **Node pools**: the ordered miner/sharder sets whose indexes feed rank
//!   computation.
//! - **Livemetrics**: per-node send/receive counters, send timers and
//!   role-specific protocol stats.
//! - **N2N plumbing**: frame codec (JSON or bincode) and a TCP transport.
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]    | `N2NConfig` timeouts and limits |
//! | [`node`]      | `NodeId`, `Node`, livemetrics, `ProtocolStats` |
//! | [`pool`]      | `NodePool` ordered by set index |
//! | [`registry`]  | `NodeRegistry` copy-on-write registry |
//! | [`codec`]     | Frame format and codecs |
//! | [`transport`] | TCP listener and `send_frame` |
//! | [`error`]     | Crate-wide error enum |

pub mod codec;
pub mod config;
pub mod error;
pub mod node;
pub mod pool;
pub mod registry;
pub mod transport;

pub use {
    codec::Codec,
    config::{MessageClass, N2NConfig},
    error::{NodeError, Result},
    node::{MinerStats, Node, NodeId, NodeInfo, NodeStatus, NodeType, ProtocolStats, SharderStats},
    pool::NodePool,
    registry::NodeRegistry,
};
