//! Hyndman–Fan type-7 quantiles.

use crate::error::StatisticError;
use crate::stats::Statistic;

/// Type-7 quantile of a sorted slice.
///
/// `h = (n - 1) p + 1`, interpolating between the two order statistics that
/// bracket `h`. `p <= 0` returns the minimum, `p >= 1` the maximum. Empty
/// input yields NaN (callers guarantee non-empty replicate vectors).
pub fn quantile_type7_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 || p <= 0.0 {
        return if p >= 1.0 { sorted[n - 1] } else { sorted[0] };
    }
    if p >= 1.0 {
        return sorted[n - 1];
    }

    let h = (n as f64 - 1.0) * p + 1.0;
    let i1 = (h.floor() as usize).clamp(1, n - 1);
    let frac = h - i1 as f64;
    sorted[i1 - 1] + (sorted[i1] - sorted[i1 - 1]) * frac
}

/// Type-7 quantile of an unsorted slice, via two selection passes.
///
/// Avoids a full sort: each bracketing order statistic is found with
/// `select_nth_unstable` on a scratch copy.
pub fn quantile_type7_unsorted(xs: &[f64], p: f64) -> f64 {
    let n = xs.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return xs[0];
    }
    if p <= 0.0 {
        return xs.iter().copied().fold(f64::INFINITY, f64::min);
    }
    if p >= 1.0 {
        return xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }

    let h = (n as f64 - 1.0) * p + 1.0;
    let i1 = (h.floor() as usize).clamp(1, n - 1);
    let frac = h - i1 as f64;

    let mut w0 = xs.to_vec();
    let (_, x0, _) =
        w0.select_nth_unstable_by(i1 - 1, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let x0 = *x0;

    let mut w1 = xs.to_vec();
    let (_, x1, _) =
        w1.select_nth_unstable_by(i1, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let x1 = *x1;

    x0 + (x1 - x0) * frac
}

/// Type-7 quantile as a statistic.
///
/// The probability is clamped to `[0, 1]` at construction; a single-element
/// sample short-circuits to that element. Support matches the input series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileStat {
    p: f64,
}

impl QuantileStat {
    pub fn new(p: f64) -> Self {
        Self {
            p: p.clamp(0.0, 1.0),
        }
    }

    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Statistic<f64> for QuantileStat {
    fn apply(&self, xs: &[f64]) -> Result<f64, StatisticError> {
        if xs.is_empty() {
            return Err(StatisticError::invalid(
                "QuantileStat",
                "quantile of an empty sample is undefined",
            ));
        }
        if xs.len() == 1 {
            return Ok(xs[0]);
        }
        Ok(quantile_type7_unsorted(xs, self.p))
    }
}
