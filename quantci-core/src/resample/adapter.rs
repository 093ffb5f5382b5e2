//! Adapter exposing the engine-facing resample shape and the delete-block
//! jackknife required by BCa.

use crate::error::{CoreError, ResampleError};
use crate::resample::Resampler;
use crate::stats::Statistic;
use rand::rngs::StdRng;

/// Wraps a value resampler with two extra capabilities:
///
/// 1. [`resample`](Self::resample) — return-by-value draw (the shape the
///    BCa engine consumes);
/// 2. [`jackknife`](Self::jackknife) — Künsch (1989) delete-block jackknife
///    pseudo-values for the acceleration constant.
///
/// The jackknife deletes *non-overlapping* blocks of length
/// `L_eff = min(L, n - 2)`, stepping by `L_eff`, and returns
/// `floor(n / L_eff)` pseudo-values — not `n`. A sliding-window delete
/// yields `n` highly correlated pseudo-values and systematically
/// under-estimates `|a|`; downstream code must read the pseudo-value count
/// from the returned vector, never assume it equals `n`.
#[derive(Debug, Clone)]
pub struct BlockResamplerAdapter<R> {
    inner: R,
}

impl<R> BlockResamplerAdapter<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R> BlockResamplerAdapter<R> {
    /// Resample and return by value.
    pub fn resample<T>(
        &self,
        x: &[T],
        m: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<T>, ResampleError>
    where
        T: Clone,
        R: Resampler<T>,
    {
        let mut y = Vec::with_capacity(m);
        self.inner.fill(x, &mut y, m, rng)?;
        Ok(y)
    }

    /// Delete-block jackknife pseudo-values of `stat` over `x`.
    ///
    /// Guards: requires `n >= 3`, and `n >= L_eff + 2` so at least two
    /// observations survive each deletion. The kept segment is copied
    /// circularly (tail after the deleted block, then the head).
    pub fn jackknife<T, S>(&self, x: &[T], stat: &S) -> Result<Vec<f64>, CoreError>
    where
        T: Clone,
        S: Statistic<T>,
        R: Resampler<T>,
    {
        let n = x.len();
        let min_keep = 2usize;

        if n < min_keep + 1 {
            return Err(ResampleError::invalid(
                "BlockResamplerAdapter::jackknife",
                format!("requires n >= 3 (got {n})"),
            )
            .into());
        }

        // Clamp so every deletion retains at least min_keep observations.
        let l_eff = self.inner.get_l().min(n - min_keep);

        if n < l_eff + min_keep {
            return Err(ResampleError::invalid(
                "BlockResamplerAdapter::jackknife",
                "sample too small for delete-block jackknife with this block length",
            )
            .into());
        }

        let keep = n - l_eff;
        let num_blocks = n / l_eff;

        let mut jk = Vec::with_capacity(num_blocks);
        let mut y: Vec<T> = Vec::with_capacity(keep);

        for b in 0..num_blocks {
            let start = b * l_eff;
            let start_keep = (start + l_eff) % n;

            // At most two spans: tail from start_keep, then the head.
            y.clear();
            let tail = keep.min(n - start_keep);
            y.extend_from_slice(&x[start_keep..start_keep + tail]);
            let head = keep - tail;
            if head != 0 {
                y.extend_from_slice(&x[..head]);
            }

            jk.push(stat.apply(&y)?);
        }

        Ok(jk)
    }
}

impl<T, R: Resampler<T>> Resampler<T> for BlockResamplerAdapter<R> {
    fn fill(
        &self,
        x: &[T],
        y: &mut Vec<T>,
        m: usize,
        rng: &mut StdRng,
    ) -> Result<(), ResampleError> {
        self.inner.fill(x, y, m, rng)
    }

    fn get_l(&self) -> usize {
        self.inner.get_l()
    }
}
