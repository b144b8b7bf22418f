//! zcn round engine
//!
//! Per-round consensus bookkeeping for a miner:
//!
//! 1. VRF shares from a threshold of miners produce the round's random seed.
//! 2. The seed fixes a permutation that ranks every miner; lower rank means
//!    higher priority as generator.
//! 3. Proposed blocks are kept in rank order; blocks that collect enough
//!    verification tickets become notarized, duplicates merge their tickets.
//! 4. The best-ranked notarized block of round `r` is finalized once a
//!    notarization for round `r + 1` appears.
//!
//! A round that times out escalates its timeout count through a peer vote
//! ([`TimeoutCounter`]) ranked by the previous round's seed.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                  Round                     │
//! │  atomics: seed, state, soft timeouts       │
//! │  ┌──────────────────────────────────────┐  │
//! │  │ RwLock: ranks, proposed, notarized,  │  │
//! │  │         shares, best block           │  │
//! │  └──────────────────────────────────────┘  │
//! │  ┌──────────────────────────────────────┐  │
//! │  │ TimeoutCounter (own lock)            │  │
//! │  └──────────────────────────────────────┘  │
//! └────────────────────────────────────────────┘
//! ```

pub mod block;
pub mod config;
pub mod error;
pub mod permutation;
pub mod round;
pub mod timeout_counter;
pub mod types;
pub mod vrf;

pub use {
    block::{Block, BlockData, BlockState, StateStatus},
    config::RoundConfig,
    error::{Result, RoundError},
    round::Round,
    timeout_counter::TimeoutCounter,
    types::{BlockVerificationTicket, Notarization, RoundState, VerificationTicket, VrfShare},
    vrf::derive_random_seed,
};
