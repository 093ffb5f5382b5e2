//! I.i.d. bootstrap resampler.

use crate::error::ResampleError;
use crate::resample::{FromBlockSize, Resampler};
use rand::rngs::StdRng;
use rand::Rng;

/// Draws with replacement, uniformly over indices `0..n`.
///
/// Equivalent to a stationary resampler with `L = 1`; used directly for
/// trade-level samples where serial dependence lives *inside* each trade
/// record rather than between records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IidResampler;

impl IidResampler {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Clone> Resampler<T> for IidResampler {
    fn fill(
        &self,
        x: &[T],
        y: &mut Vec<T>,
        m: usize,
        rng: &mut StdRng,
    ) -> Result<(), ResampleError> {
        let n = x.len();
        if n < 2 {
            return Err(ResampleError::invalid(
                "IidResampler",
                format!("x.len() must be >= 2 (got {n})"),
            ));
        }
        if m < 2 {
            return Err(ResampleError::invalid(
                "IidResampler",
                format!("m must be >= 2 (got {m})"),
            ));
        }

        y.clear();
        y.reserve(m);
        for _ in 0..m {
            let pos = rng.gen_range(0..n);
            y.push(x[pos].clone());
        }
        Ok(())
    }

    fn get_l(&self) -> usize {
        1
    }
}

impl FromBlockSize for IidResampler {
    fn from_block_size(_l: usize) -> Self {
        Self
    }
}
