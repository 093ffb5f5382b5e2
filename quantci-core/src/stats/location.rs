//! Location statistics: arithmetic and geometric mean.

use crate::error::StatisticError;
use crate::stats::{describe, Statistic};

/// Arithmetic mean of the returns. Empty input yields 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanStat;

impl Statistic<f64> for MeanStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        Ok(describe::mean(xs))
    }
}

/// How the geometric mean treats ruin events (`1 + r <= 0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuinPolicy {
    /// Fail with a domain error.
    Strict,
    /// Clamp the offending return to `-1 + eps`.
    ClipTo(f64),
}

/// Geometric mean return: `exp(mean(ln(1 + r))) - 1`.
///
/// Under [`RuinPolicy::Strict`] (the default) any `1 + r <= 0` is a domain
/// error; under clip-ruin the return is clamped to `-1 + eps` so the log
/// stays finite. Empty input yields 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricMeanStat {
    ruin_policy: RuinPolicy,
}

impl GeometricMeanStat {
    pub const DEFAULT_CLIP_EPS: f64 = 1e-6;

    pub fn new() -> Self {
        Self {
            ruin_policy: RuinPolicy::Strict,
        }
    }

    /// Clip-ruin mode with the default epsilon.
    pub fn clip_ruin() -> Self {
        Self {
            ruin_policy: RuinPolicy::ClipTo(Self::DEFAULT_CLIP_EPS),
        }
    }

    pub fn with_ruin_policy(ruin_policy: RuinPolicy) -> Self {
        Self { ruin_policy }
    }
}

impl Default for GeometricMeanStat {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistic<f64> for GeometricMeanStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        if xs.is_empty() {
            return Ok(0.0);
        }

        let mut log_sum = 0.0;
        for &r in xs {
            let growth = 1.0 + r;
            let growth = if growth <= 0.0 {
                match self.ruin_policy {
                    RuinPolicy::Strict => {
                        return Err(StatisticError::domain(
                            "GeometricMeanStat",
                            format!("1 + r <= 0 for return {r}"),
                        ));
                    }
                    RuinPolicy::ClipTo(eps) => eps,
                }
            } else {
                growth
            };
            log_sum += growth.ln();
        }

        Ok((log_sum / xs.len() as f64).exp() - 1.0)
    }
}
