//! Error types for the round engine.

use thiserror::Error;

/// Errors raised by round operations.
///
/// Duplicate shares, duplicate proposals and already-merged notarizations
/// are not errors; those return `false` to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    /// A notarized block arrived without a round random seed.
    #[error("block {hash} of round {round} has no seed")]
    BlockHasNoSeed { round: i64, hash: String },

    /// A miner rank was requested before the round's permutation existed.
    #[error("miner ranks not computed yet for round {round}")]
    PermutationNotComputed { round: i64 },

    /// The miner's set index is past the end of the permutation, which
    /// happens when the miner set grew mid-round.
    #[error("set index {index} outside permutation of {len} miners")]
    RankIndexOutOfRange { index: usize, len: usize },
}

/// Convenience result type for round operations.
pub type Result<T> = std::result::Result<T, RoundError>;
