//! Bootstrap CI engines.
//!
//! Six constructions over a shared replicate loop: Normal (Wald), Basic
//! (reverse percentile), Percentile, M-out-of-N percentile, Percentile-T
//! (double bootstrap), and BCa. Every engine:
//!
//! - validates `B >= 400` and `cl ∈ (0.5, 1)` at construction;
//! - resamples and evaluates the statistic for each replicate in parallel,
//!   with one deterministic RNG engine per replicate index;
//! - skips non-finite replicates and fails with a degenerate-replicates
//!   error when fewer than half survive;
//! - exposes the last run's bootstrap distribution (stats, mean, variance,
//!   SE) as an atomic snapshot, invalidated by a failed run.
//!
//! Thread-safety follows the ownership system: [`PercentileBootstrap`] and
//! [`NormalBootstrap`] take `&self` in `run` (mutex-guarded diagnostics,
//! safe for concurrent runs on one instance); the remaining engines take
//! `&mut self`.

mod basic;
mod bca;
mod m_out_of_n;
mod normal;
mod percentile;
mod percentile_t;

pub use basic::BasicBootstrap;
pub use bca::{BcaBootstrap, BcaResult};
pub use m_out_of_n::{choose_subsample_ratio, MOutOfNPercentileBootstrap};
pub use normal::NormalBootstrap;
pub use percentile::PercentileBootstrap;
pub use percentile_t::{PercentileTBootstrap, MIN_INNER};

use crate::error::BootstrapError;
use quantci_core::{
    sample_variance, EngineProvider, Executor, Resampler, Statistic,
};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Which tail(s) of the interval are meaningful.
///
/// One-sided intervals leave the unused side effectively unbounded: the
/// quantile-based engines evaluate it at a `1e-10` tail probability (the
/// empirical extreme), the Normal engine pushes it `1e6` standard errors out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalType {
    TwoSided,
    OneSidedLower,
    OneSidedUpper,
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    /// θ̂ on the original sample.
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub cl: f64,
    pub b_requested: usize,
    pub b_effective: usize,
    pub b_skipped: usize,
    pub n: usize,
    /// Resampler mean block length (diagnostic).
    pub l: usize,
    /// Bootstrap standard error of the replicate distribution.
    pub se_boot: f64,
}

/// Snapshot of the bootstrap distribution from the most recent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapDiagnostics {
    /// Usable replicate statistics, in replicate-index order.
    pub stats: Vec<f64>,
    pub mean_boot: f64,
    pub var_boot: f64,
    pub se_boot: f64,
}

impl BootstrapDiagnostics {
    pub(crate) fn from_replicates(stats: Vec<f64>) -> Self {
        let mean_boot = quantci_core::mean(&stats);
        let var_boot = sample_variance(&stats);
        Self {
            mean_boot,
            var_boot,
            se_boot: var_boot.sqrt(),
            stats,
        }
    }
}

/// Tail probability used for the "effectively unbounded" side of one-sided
/// intervals on quantile-based engines.
pub(crate) const TAIL_EPS: f64 = 1e-10;

/// Tail probabilities for engines whose interval reads the replicate
/// quantiles directly (Percentile, M-out-of-N).
pub(crate) fn direct_tail_probs(interval: IntervalType, alpha: f64) -> (f64, f64) {
    match interval {
        IntervalType::TwoSided => (alpha / 2.0, 1.0 - alpha / 2.0),
        IntervalType::OneSidedLower => (alpha, 1.0 - TAIL_EPS),
        IntervalType::OneSidedUpper => (TAIL_EPS, 1.0 - alpha),
    }
}

/// Tail probabilities for engines whose formula *reverses* the replicate
/// quantiles (Basic, Percentile-T): the upper replicate quantile drives the
/// lower endpoint and vice versa, so the one-sided assignments swap.
pub(crate) fn reverse_tail_probs(interval: IntervalType, alpha: f64) -> (f64, f64) {
    match interval {
        IntervalType::TwoSided => (alpha / 2.0, 1.0 - alpha / 2.0),
        IntervalType::OneSidedLower => (TAIL_EPS, 1.0 - alpha),
        IntervalType::OneSidedUpper => (alpha, 1.0 - TAIL_EPS),
    }
}

/// Standard normal CDF.
pub(crate) fn phi(x: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.cdf(x)
}

/// Standard normal inverse CDF.
pub(crate) fn phi_inv(p: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.inverse_cdf(p)
}

pub(crate) fn validate_engine_params(
    engine: &'static str,
    b: usize,
    cl: f64,
) -> Result<(), BootstrapError> {
    if b < 400 {
        return Err(BootstrapError::invalid(
            engine,
            format!("B should be >= 400 (got {b})"),
        ));
    }
    if !(cl > 0.5 && cl < 1.0) {
        return Err(BootstrapError::invalid(
            engine,
            format!("CL must be in (0.5, 1) (got {cl})"),
        ));
    }
    Ok(())
}

/// Run the shared replicate loop: `b` resamples of length `m`, statistic per
/// resample, non-finite replicates dropped. Returns the usable statistics in
/// replicate-index order plus the skip count.
pub(crate) fn collect_replicates<T, S, R, E, P>(
    x: &[T],
    m: usize,
    stat: &S,
    resampler: &R,
    exec: &E,
    provider: &P,
    b: usize,
    chunk_hint: usize,
) -> (Vec<f64>, usize)
where
    T: Clone + Sync,
    S: Statistic<T> + Sync,
    R: Resampler<T> + Sync,
    E: Executor,
    P: EngineProvider + Sync,
{
    let raw = exec.map_chunked(b, chunk_hint, |rep| {
        let mut rng = provider.make_engine(rep as u64);
        let mut y: Vec<T> = Vec::with_capacity(m);
        if resampler.fill(x, &mut y, m, &mut rng).is_err() {
            return f64::NAN;
        }
        match stat.apply(&y) {
            Ok(v) if v.is_finite() => v,
            _ => f64::NAN,
        }
    });

    let usable: Vec<f64> = raw.into_iter().filter(|v| v.is_finite()).collect();
    let skipped = b - usable.len();
    (usable, skipped)
}

/// Degenerate-replicates guard: at least ⌈B/2⌉ usable replicates required.
pub(crate) fn ensure_enough_replicates(
    engine: &'static str,
    usable: usize,
    requested: usize,
) -> Result<(), BootstrapError> {
    if usable * 2 < requested {
        return Err(BootstrapError::DegenerateReplicates {
            engine,
            usable,
            requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_tails_two_sided() {
        let (pl, pu) = direct_tail_probs(IntervalType::TwoSided, 0.05);
        assert!((pl - 0.025).abs() < 1e-15);
        assert!((pu - 0.975).abs() < 1e-15);
    }

    #[test]
    fn direct_tails_one_sided() {
        let (pl, pu) = direct_tail_probs(IntervalType::OneSidedLower, 0.05);
        assert!((pl - 0.05).abs() < 1e-15);
        assert!(pu > 1.0 - 1e-9);

        let (pl, pu) = direct_tail_probs(IntervalType::OneSidedUpper, 0.05);
        assert!(pl < 1e-9);
        assert!((pu - 0.95).abs() < 1e-15);
    }

    #[test]
    fn reverse_tails_swap_one_sided_assignment() {
        // The reverse formula maps the pu-quantile to the lower endpoint,
        // so a lower-only interval pins pu = 1 - alpha.
        let (pl, pu) = reverse_tail_probs(IntervalType::OneSidedLower, 0.05);
        assert!(pl < 1e-9);
        assert!((pu - 0.95).abs() < 1e-15);

        let (pl, pu) = reverse_tail_probs(IntervalType::OneSidedUpper, 0.05);
        assert!((pl - 0.05).abs() < 1e-15);
        assert!(pu > 1.0 - 1e-9);
    }

    #[test]
    fn phi_and_phi_inv_roundtrip() {
        for p in [0.025, 0.1, 0.5, 0.9, 0.975] {
            assert!((phi(phi_inv(p)) - p).abs() < 1e-12);
        }
        assert!((phi_inv(0.975) - 1.959964).abs() < 1e-5);
    }

    #[test]
    fn replicate_guard_threshold() {
        assert!(ensure_enough_replicates("X", 200, 400).is_ok());
        assert!(ensure_enough_replicates("X", 199, 400).is_err());
        assert!(ensure_enough_replicates("X", 250, 500).is_ok());
        // Odd request: ceil(401/2) = 201.
        assert!(ensure_enough_replicates("X", 201, 401).is_ok());
        assert!(ensure_enough_replicates("X", 200, 401).is_err());
    }

    #[test]
    fn param_validation() {
        assert!(validate_engine_params("X", 399, 0.95).is_err());
        assert!(validate_engine_params("X", 400, 0.5).is_err());
        assert!(validate_engine_params("X", 400, 1.0).is_err());
        assert!(validate_engine_params("X", 400, 0.95).is_ok());
    }
}
