//! Deterministic permutations derived from round seeds.
//!
//! Every miner must arrive at the same permutation for the same seed, so the
//! generator is fixed (ChaCha8) and seeded from the seed's raw bits.

use {
    rand::{seq::SliceRandom, SeedableRng},
    rand_chacha::ChaCha8Rng,
};

/// A permutation of `0..n` determined by `seed`.
pub fn permutation(seed: i64, n: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(&mut rng);
    perm
}
