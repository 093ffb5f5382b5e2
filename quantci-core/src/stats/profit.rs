//! Profit-factor family: classical, log-domain, robust, and the
//! profitability pair derived from them.

use crate::error::StatisticError;
use crate::stats::{Statistic, StatisticSupport};

/// Sentinel returned when the loss denominator is zero (all-winning series).
pub const PF_SENTINEL: f64 = 100.0;

/// Classical profit factor: `sum(max(r, 0)) / |sum(min(r, 0))|`.
///
/// A zero denominator yields [`PF_SENTINEL`]. Optional log-compression maps
/// the output through `ln(1 + PF)`, which tames the sentinel when the
/// statistic feeds a bootstrap distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfitFactorStat {
    log_compress: bool,
}

impl ProfitFactorStat {
    pub fn new() -> Self {
        Self {
            log_compress: false,
        }
    }

    pub fn log_compressed() -> Self {
        Self { log_compress: true }
    }
}

impl Statistic<f64> for ProfitFactorStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        let gains: f64 = xs.iter().filter(|&&r| r > 0.0).sum();
        let losses: f64 = xs.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();

        let pf = if losses == 0.0 {
            PF_SENTINEL
        } else {
            gains / losses
        };

        Ok(if self.log_compress { (1.0 + pf).ln() } else { pf })
    }

    fn is_ratio_statistic(&self) -> bool {
        true
    }

    fn support(&self) -> StatisticSupport {
        StatisticSupport::StrictlyPositive
    }
}

/// Classical log profit factor.
///
/// Works on log-returns `ln(1 + r)`; the ratio is the sum of positive
/// log-returns over the absolute sum of negative ones. Skip policy: returns
/// with `r <= -1` (ruin events, undefined log) are discarded. Zero
/// denominator yields [`PF_SENTINEL`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogProfitFactorStat;

impl LogProfitFactorStat {
    pub fn new() -> Self {
        Self
    }
}

impl Statistic<f64> for LogProfitFactorStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        let mut num = 0.0;
        let mut denom = 0.0;
        for &r in xs.iter().filter(|&&r| r > -1.0) {
            let lr = (1.0 + r).ln();
            if lr > 0.0 {
                num += lr;
            } else {
                denom += -lr;
            }
        }

        if denom == 0.0 {
            return Ok(PF_SENTINEL);
        }
        Ok(num / denom)
    }

    fn is_ratio_statistic(&self) -> bool {
        true
    }

    fn support(&self) -> StatisticSupport {
        StatisticSupport::StrictlyPositive
    }
}

/// Robust log profit factor.
///
/// Two regularizations on top of the classical version:
/// - ruin events are clamped to `1 + r_clip_eps` before the log, so no
///   observation is discarded;
/// - a prior ridge `prior_strength * denom_floor` is added to the
///   denominator.
///
/// The output is finite and non-negative for any finite input, which keeps
/// bootstrap replicates usable even on all-winning resamples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustLogProfitFactorStat {
    prior_strength: f64,
    denom_floor: f64,
    r_clip_eps: f64,
}

impl RobustLogProfitFactorStat {
    pub const DEFAULT_PRIOR_STRENGTH: f64 = 1.0;
    pub const DEFAULT_DENOM_FLOOR: f64 = 0.05;
    pub const DEFAULT_CLIP_EPS: f64 = 1e-6;

    pub fn new() -> Self {
        Self {
            prior_strength: Self::DEFAULT_PRIOR_STRENGTH,
            denom_floor: Self::DEFAULT_DENOM_FLOOR,
            r_clip_eps: Self::DEFAULT_CLIP_EPS,
        }
    }

    pub fn with_params(prior_strength: f64, denom_floor: f64, r_clip_eps: f64) -> Self {
        Self {
            prior_strength,
            denom_floor,
            r_clip_eps,
        }
    }
}

impl Default for RobustLogProfitFactorStat {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistic<f64> for RobustLogProfitFactorStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        let mut num = 0.0;
        let mut denom = 0.0;
        for &r in xs {
            let growth = (1.0 + r).max(self.r_clip_eps);
            let lr = growth.ln();
            if lr > 0.0 {
                num += lr;
            } else {
                denom += -lr;
            }
        }

        let ridged = denom + self.prior_strength * self.denom_floor;
        Ok(num / ridged)
    }

    fn is_ratio_statistic(&self) -> bool {
        true
    }

    fn support(&self) -> StatisticSupport {
        StatisticSupport::StrictlyPositive
    }
}

/// `(PF, p)` where `p = 100 * PF / (PF + R_wl)` and `R_wl` is the ratio of
/// the average win to the average absolute loss.
///
/// Edge cases: no losing returns gives `p = 100`; no winning returns gives
/// `p = 0`.
pub fn profitability_pair(xs: &[f64]) -> (f64, f64) {
    let wins: Vec<f64> = xs.iter().copied().filter(|&r| r > 0.0).collect();
    let losses: Vec<f64> = xs.iter().copied().filter(|&r| r < 0.0).collect();

    let gains: f64 = wins.iter().sum();
    let loss_total: f64 = losses.iter().map(|r| r.abs()).sum();

    let pf = if loss_total == 0.0 {
        PF_SENTINEL
    } else {
        gains / loss_total
    };

    if wins.is_empty() {
        return (pf, 0.0);
    }
    if losses.is_empty() {
        return (pf, 100.0);
    }

    let avg_win = gains / wins.len() as f64;
    let avg_loss = loss_total / losses.len() as f64;
    let r_wl = avg_win / avg_loss;

    (pf, 100.0 * pf / (pf + r_wl))
}

/// Profitability `p` of the pair, as a statistic (reported in percent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfitabilityStat;

impl ProfitabilityStat {
    pub fn new() -> Self {
        Self
    }
}

impl Statistic<f64> for ProfitabilityStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        Ok(profitability_pair(xs).1)
    }
}
