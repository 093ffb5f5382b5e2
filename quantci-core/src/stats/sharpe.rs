//! Annualized Sharpe ratio statistic.

use crate::error::StatisticError;
use crate::stats::{describe, Statistic};

/// `(mean - rf) / sqrt(var + eps) * sqrt(periods_per_year)`.
///
/// `var` is the Bessel-corrected sample variance of the per-period returns.
/// With `eps = 0` a zero-variance (degenerate) series yields 0 rather than
/// dividing by zero; a positive `eps` regularizes the denominator instead.
/// Fewer than 2 observations yield 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpeStat {
    rf_per_period: f64,
    periods_per_year: f64,
    eps: f64,
}

impl SharpeStat {
    /// Daily-bar default: zero risk-free rate, 252 periods, no ridge.
    pub fn new() -> Self {
        Self {
            rf_per_period: 0.0,
            periods_per_year: 252.0,
            eps: 0.0,
        }
    }

    pub fn with_params(rf_per_period: f64, periods_per_year: f64, eps: f64) -> Self {
        Self {
            rf_per_period,
            periods_per_year,
            eps,
        }
    }
}

impl Default for SharpeStat {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistic<f64> for SharpeStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        if xs.len() < 2 {
            return Ok(0.0);
        }

        let excess: Vec<f64> = xs.iter().map(|r| r - self.rf_per_period).collect();
        let mean = describe::mean(&excess);
        let denom = (describe::sample_variance(&excess) + self.eps).sqrt();

        if denom < 1e-15 {
            return Ok(0.0);
        }
        Ok(mean / denom * self.periods_per_year.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_for_consistently_positive_returns() {
        let xs: Vec<f64> = (0..252)
            .map(|i| 0.001 + 0.0001 * ((i as f64 * 0.1).sin()))
            .collect();
        let s = SharpeStat::new().apply(&xs).unwrap();
        assert!(s > 10.0, "expected very high Sharpe, got {s}");
    }

    #[test]
    fn zero_variance_yields_zero() {
        let xs = vec![0.001; 100];
        assert_eq!(SharpeStat::new().apply(&xs).unwrap(), 0.0);
    }

    #[test]
    fn fewer_than_two_observations_yield_zero() {
        assert_eq!(SharpeStat::new().apply(&[]).unwrap(), 0.0);
        assert_eq!(SharpeStat::new().apply(&[0.01]).unwrap(), 0.0);
    }

    #[test]
    fn ridge_keeps_degenerate_series_finite() {
        let xs = vec![0.001; 100];
        let s = SharpeStat::with_params(0.0, 252.0, 1e-8).apply(&xs).unwrap();
        assert!(s.is_finite());
        assert!(s > 0.0);
    }

    #[test]
    fn risk_free_rate_shifts_the_numerator() {
        let xs: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 0.01 } else { -0.005 })
            .collect();
        let without = SharpeStat::new().apply(&xs).unwrap();
        let with = SharpeStat::with_params(0.001, 252.0, 0.0).apply(&xs).unwrap();
        assert!(with < without);
    }
}
