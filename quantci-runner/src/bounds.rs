//! Conservative monthly return bounds from a closed-position history.
//!
//! Builds monthly compounded returns, runs BCa independently on a lower and
//! an upper quantile of the monthly series, and exposes operational bounds:
//! conservative policy takes the outer CI endpoints, point policy the point
//! quantiles.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::engines::{BcaBootstrap, IntervalType};
use crate::error::BootstrapError;
use quantci_core::{
    CrnProvider, StatisticError, Statistic, StationaryBlockValueResampler, ThreadPoolExecutor,
};

/// Fewest monthly observations accepted for quantile bounds.
const MIN_MONTHS: usize = 8;

/// Clamp range for the ACF block-length heuristic.
const MIN_HEURISTIC_L: usize = 2;
const MAX_HEURISTIC_L: usize = 6;

/// Long or short exposure; short positions' bar returns are sign-flipped
/// when compounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

/// One closed position: its side and the dated per-bar price returns over
/// its holding period (the final bar computed against the exit fill).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub side: PositionSide,
    pub bars: Vec<(NaiveDate, f64)>,
}

/// Compound per-bar returns into calendar-month returns.
///
/// Short positions contribute sign-flipped bar returns. Months with no
/// exposure are omitted — the output is a sparse series in chronological
/// order, not a zero-filled one (zero-filling would bias both the bootstrap
/// center and the block-length heuristic).
pub fn monthly_returns_from_closed_positions(positions: &[ClosedPosition]) -> Vec<f64> {
    let mut month_mult: BTreeMap<(i32, u32), f64> = BTreeMap::new();

    for pos in positions {
        for &(date, bar_return) in &pos.bars {
            let r = match pos.side {
                PositionSide::Long => bar_return,
                PositionSide::Short => -bar_return,
            };
            let mult = month_mult.entry((date.year(), date.month())).or_insert(1.0);
            *mult *= 1.0 + r;
        }
    }

    month_mult.into_values().map(|m| m - 1.0).collect()
}

/// Order-statistic empirical quantile: `m = clamp(⌊p(n+1)⌋, 1, n)`, value
/// `x_(m)`. No interpolation.
pub fn empirical_quantile(xs: &[f64], p: f64) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return xs.iter().copied().fold(f64::INFINITY, f64::min);
    }
    if p >= 1.0 {
        return xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }

    let n = xs.len();
    let m = ((p * (n as f64 + 1.0)).floor() as usize).clamp(1, n) - 1;

    let mut w = xs.to_vec();
    let (_, v, _) =
        w.select_nth_unstable_by(m, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    *v
}

/// Pick a stationary-bootstrap block length from the series' sample
/// autocorrelation: the first lag whose |ACF| falls below `2/√n`, clamped
/// to `[2, 6]`.
pub fn heuristic_block_length(series: &[f64]) -> usize {
    let n = series.len();
    if n < 4 {
        return MIN_HEURISTIC_L;
    }

    let mean = quantci_core::mean(series);
    let denom: f64 = series.iter().map(|v| (v - mean).powi(2)).sum();
    if denom <= 0.0 {
        return MIN_HEURISTIC_L;
    }

    let threshold = 2.0 / (n as f64).sqrt();
    let max_lag = (n - 2).min(MAX_HEURISTIC_L);
    let mut k_star = max_lag + 1;
    for k in 1..=max_lag {
        let num: f64 = (0..n - k)
            .map(|t| (series[t] - mean) * (series[t + k] - mean))
            .sum();
        if (num / denom).abs() < threshold {
            k_star = k;
            break;
        }
    }

    k_star.clamp(MIN_HEURISTIC_L, MAX_HEURISTIC_L)
}

/// A quantile's point estimate and its BCa CI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileCi {
    pub point: f64,
    pub lo: f64,
    pub hi: f64,
}

/// Which estimates drive the operational bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundPolicy {
    /// Outer CI endpoints (default).
    Conservative,
    /// Point quantiles.
    Point,
}

/// Parameters for [`BoundFutureReturns`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundFutureReturnsParams {
    /// Stationary block length in months; `0` requests the ACF heuristic.
    pub block_len: usize,
    pub lower_quantile_p: f64,
    pub upper_quantile_p: f64,
    pub num_bootstraps: usize,
    pub confidence_level: f64,
    pub interval_type: IntervalType,
    pub master_seed: u64,
}

impl Default for BoundFutureReturnsParams {
    fn default() -> Self {
        Self {
            block_len: 3,
            lower_quantile_p: 0.10,
            upper_quantile_p: 0.90,
            num_bootstraps: 5000,
            confidence_level: 0.95,
            interval_type: IntervalType::TwoSided,
            master_seed: 42,
        }
    }
}

/// Order-statistic quantile as the BCa statistic.
#[derive(Debug, Clone, Copy)]
struct OrderStatisticQuantile {
    p: f64,
}

impl Statistic<f64> for OrderStatisticQuantile {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        if xs.is_empty() {
            return Err(StatisticError::invalid(
                "OrderStatisticQuantile",
                "empty sample",
            ));
        }
        Ok(empirical_quantile(xs, self.p))
    }
}

/// Conservative future-return bounds via BCa CIs on monthly return
/// quantiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundFutureReturns {
    params: BoundFutureReturnsParams,
    block_len_used: usize,
    monthly: Vec<f64>,
    lower: QuantileCi,
    upper: QuantileCi,
    policy: BoundPolicy,
    operational_lower: f64,
    operational_upper: f64,
}

impl BoundFutureReturns {
    const NAME: &'static str = "BoundFutureReturns";

    /// Build monthly returns from a closed-position history, then bound.
    pub fn from_closed_positions(
        positions: &[ClosedPosition],
        params: BoundFutureReturnsParams,
    ) -> Result<Self, BootstrapError> {
        Self::from_monthly_returns(monthly_returns_from_closed_positions(positions), params)
    }

    /// Bound from a pre-built monthly return series.
    ///
    /// Fails with an invalid-argument error on malformed quantile
    /// probabilities (`p_L ∉ (0, 0.5)`, `p_U ∉ (0.5, 1)`), `B < 1000`,
    /// `cl ∉ (0, 1)`, or fewer than 8 months of data.
    pub fn from_monthly_returns(
        monthly: Vec<f64>,
        params: BoundFutureReturnsParams,
    ) -> Result<Self, BootstrapError> {
        Self::validate(&params)?;

        if monthly.len() < MIN_MONTHS {
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!(
                    "need at least {MIN_MONTHS} months to estimate quantile bounds robustly (got {})",
                    monthly.len()
                ),
            ));
        }

        let block_len_used = if params.block_len == 0 {
            heuristic_block_length(&monthly)
        } else {
            params.block_len
        };

        // One-sided requests split per tail: the lower quantile cares about
        // its lower endpoint, the upper quantile about its upper endpoint.
        let (lower_interval, upper_interval) = match params.interval_type {
            IntervalType::TwoSided => (IntervalType::TwoSided, IntervalType::TwoSided),
            _ => (IntervalType::OneSidedLower, IntervalType::OneSidedUpper),
        };

        let lower = Self::quantile_ci(
            &monthly,
            params.lower_quantile_p,
            block_len_used,
            params.num_bootstraps,
            params.confidence_level,
            lower_interval,
            CrnProvider::new(params.master_seed, 0, block_len_used as u64, 0, 0),
        )?;
        let upper = Self::quantile_ci(
            &monthly,
            params.upper_quantile_p,
            block_len_used,
            params.num_bootstraps,
            params.confidence_level,
            upper_interval,
            CrnProvider::new(params.master_seed, 1, block_len_used as u64, 0, 0),
        )?;

        Ok(Self {
            params,
            block_len_used,
            monthly,
            lower,
            upper,
            policy: BoundPolicy::Conservative,
            operational_lower: lower.lo,
            operational_upper: upper.hi,
        })
    }

    fn quantile_ci(
        monthly: &[f64],
        p: f64,
        block_len: usize,
        b: usize,
        cl: f64,
        interval_type: IntervalType,
        provider: CrnProvider,
    ) -> Result<QuantileCi, BootstrapError> {
        let stat = OrderStatisticQuantile { p };
        let resampler = StationaryBlockValueResampler::new(block_len)
            .map_err(|e| BootstrapError::from_resample(Self::NAME, e))?;

        let mut bca = BcaBootstrap::<_, ThreadPoolExecutor>::new(b, cl, resampler, interval_type)?;
        let res = bca.run(monthly, &stat, &provider)?;

        Ok(QuantileCi {
            point: empirical_quantile(monthly, p),
            lo: res.base.lower,
            hi: res.base.upper,
        })
    }

    fn validate(params: &BoundFutureReturnsParams) -> Result<(), BootstrapError> {
        if !(params.lower_quantile_p > 0.0 && params.lower_quantile_p < 0.5) {
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!(
                    "lower quantile p must be in (0, 0.5) (got {})",
                    params.lower_quantile_p
                ),
            ));
        }
        if !(params.upper_quantile_p > 0.5 && params.upper_quantile_p < 1.0) {
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!(
                    "upper quantile p must be in (0.5, 1) (got {})",
                    params.upper_quantile_p
                ),
            ));
        }
        if params.num_bootstraps < 1000 {
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!("num_bootstraps should be >= 1000 (got {})", params.num_bootstraps),
            ));
        }
        if !(params.confidence_level > 0.0 && params.confidence_level < 1.0) {
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!(
                    "confidence level must be in (0, 1) (got {})",
                    params.confidence_level
                ),
            ));
        }
        Ok(())
    }

    // ── Monitoring getters ───────────────────────────────────────────

    /// Lower monitoring bound under the active policy.
    pub fn get_lower_bound(&self) -> f64 {
        self.operational_lower
    }

    /// Upper monitoring bound under the active policy.
    pub fn get_upper_bound(&self) -> f64 {
        self.operational_upper
    }

    /// Conservative policy: CI endpoints (the default).
    pub fn use_conservative_policy(&mut self) {
        self.policy = BoundPolicy::Conservative;
        self.operational_lower = self.lower.lo;
        self.operational_upper = self.upper.hi;
    }

    /// Point policy: the point quantiles themselves.
    pub fn use_point_policy(&mut self) {
        self.policy = BoundPolicy::Point;
        self.operational_lower = self.lower.point;
        self.operational_upper = self.upper.point;
    }

    pub fn policy(&self) -> BoundPolicy {
        self.policy
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    pub fn monthly_returns(&self) -> &[f64] {
        &self.monthly
    }

    pub fn block_length_used(&self) -> usize {
        self.block_len_used
    }

    pub fn lower_quantile_ci(&self) -> QuantileCi {
        self.lower
    }

    pub fn upper_quantile_ci(&self) -> QuantileCi {
        self.upper
    }

    pub fn lower_point_quantile(&self) -> f64 {
        self.lower.point
    }

    pub fn upper_point_quantile(&self) -> f64 {
        self.upper.point
    }

    pub fn params(&self) -> &BoundFutureReturnsParams {
        &self.params
    }
}
