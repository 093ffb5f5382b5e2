//! Resampling primitives for the bootstrap engines.
//!
//! Every resampler draws a length-`m` series from a length-`n` input:
//! - [`IidResampler`]: with replacement, uniformly over indices.
//! - [`StationaryBlockValueResampler`]: Politis–Romano stationary bootstrap
//!   via geometric block lengths copied from a doubled buffer.
//! - [`StationaryMaskValueResampler`]: the same distribution expressed
//!   through a Bernoulli(1/L) restart mask.
//! - [`StationaryMaskIndexResampler`]: emits the index trajectory instead of
//!   values, to synchronize resampling across parallel series.
//!
//! [`BlockResamplerAdapter`] wraps a value resampler with the
//! return-by-value call shape and the Künsch delete-block jackknife that the
//! BCa engine needs.

mod adapter;
mod iid;
mod mask;
mod stationary;

pub use adapter::BlockResamplerAdapter;
pub use iid::IidResampler;
pub use mask::make_restart_mask;
pub use stationary::{
    StationaryBlockValueResampler, StationaryMaskIndexResampler, StationaryMaskValueResampler,
};

use crate::error::ResampleError;
use rand::rngs::StdRng;

/// A value resampler: fills `y` with a length-`m` draw from `x`.
///
/// Contracts shared by all implementations:
/// - fails with an invalid-argument error when `x.len() < 2` or `m < 2`;
/// - every output element is a clone of some input element;
/// - identical RNG state produces identical output;
/// - `get_l() == 1` degenerates to i.i.d. draws, `get_l() >= n` to a single
///   block covering the whole sample.
pub trait Resampler<T> {
    fn fill(&self, x: &[T], y: &mut Vec<T>, m: usize, rng: &mut StdRng)
        -> Result<(), ResampleError>;

    /// Mean block length parameter (1 for i.i.d.).
    fn get_l(&self) -> usize;
}

/// Construct a resampler from a mean block length.
///
/// Lets generic orchestration code build whichever resampler type it was
/// instantiated with: block resamplers take the length, [`IidResampler`]
/// ignores it.
pub trait FromBlockSize {
    fn from_block_size(l: usize) -> Self;
}
