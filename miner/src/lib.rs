//! zcn miner
//!
//! Drives the round engine from the network:
//!
//! ```text
//!  N2N transport ──► BlockMessageRouter ──► block messages ──► BlockMessageProcessor
//!        ▲                  │ (admission)                           │ (round mutations)
//!        │                  ▼                                       ▼
//!   EntitySender ◄── catch-up pushes                     finalized rounds
//!                                                                   │
//!                                                                   ▼
//!                                                       FinalizeRoundWorker
//!                                                  (RoundFinalizer, RoundInfoStore)
//! ```
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chain`]     | `MinerChain` round table, round numbers and channels |
//! | [`config`]    | `MinerConfig` |
//! | [`driver`]    | `FinalizeRoundWorker` and its collaborators |
//! | [`message`]   | Wire `Envelope`, `N2NEntity` and internal `BlockMessage` |
//! | [`processor`] | `BlockMessageProcessor` consumer loop |
//! | [`router`]    | `BlockMessageRouter` admission control |
//! | [`sender`]    | `EntitySender` and the TCP implementation |
//! | [`service`]   | `MinerService` task wiring and shutdown |
//! | [`error`]     | Crate-wide error enum |

pub mod chain;
pub mod config;
pub mod driver;
pub mod error;
pub mod message;
pub mod processor;
pub mod router;
pub mod sender;
pub mod service;

pub use {
    chain::{ChainReceivers, MinerChain},
    config::MinerConfig,
    driver::{FinalizeRoundWorker, InMemoryRoundInfoStore, RoundFinalizer, RoundInfo, RoundInfoStore},
    error::{MinerError, Result},
    message::{BlockMessage, Envelope, N2NEntity},
    processor::BlockMessageProcessor,
    router::BlockMessageRouter,
    sender::{EntitySender, TcpSender},
    service::MinerService,
};
