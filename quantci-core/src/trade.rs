//! Trade-level samples.
//!
//! At trade level the bootstrap resamples whole trades (each carrying its
//! ordered per-bar return path) rather than individual bars, so dependence
//! *inside* a trade is preserved exactly while trades themselves are treated
//! as exchangeable.

use crate::error::StatisticError;
use crate::stats::{Statistic, StatisticSupport};
use serde::{Deserialize, Serialize};

/// One closed trade: its ordered per-bar mark-to-market returns and its
/// duration in bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub bar_returns: Vec<f64>,
    pub duration_bars: usize,
}

impl TradeRecord {
    pub fn new(bar_returns: Vec<f64>) -> Self {
        let duration_bars = bar_returns.len();
        Self {
            bar_returns,
            duration_bars,
        }
    }

    /// Build a record from gross per-bar returns, deducting a round-trip
    /// cost fraction from the final bar: the trade's terminal growth is
    /// scaled by `1 - round_trip_cost`.
    ///
    /// Fails with an invalid-argument error when the cost lies outside
    /// `[0, 1)`.
    pub fn from_gross(
        bar_returns: Vec<f64>,
        round_trip_cost: f64,
    ) -> Result<Self, StatisticError> {
        if !(0.0..1.0).contains(&round_trip_cost) || !round_trip_cost.is_finite() {
            return Err(StatisticError::invalid(
                "TradeRecord",
                format!("round_trip_cost must be in [0, 1) (got {round_trip_cost})"),
            ));
        }
        let mut bar_returns = bar_returns;
        if let Some(last) = bar_returns.last_mut() {
            *last = (1.0 + *last) * (1.0 - round_trip_cost) - 1.0;
        }
        Ok(Self::new(bar_returns))
    }

    /// Compounded trade return: `prod(1 + r_t) - 1`.
    pub fn compound_return(&self) -> f64 {
        self.bar_returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
    }
}

/// Lifts a bar-level statistic to trade-level samples by flattening the
/// trades' per-bar returns in order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeCompound<S> {
    inner: S,
}

impl<S> TradeCompound<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Statistic<f64>> Statistic<TradeRecord> for TradeCompound<S> {
    fn apply(&self, xs: &[TradeRecord]) -> Result<f64, StatisticError> {
        let flat: Vec<f64> = xs
            .iter()
            .flat_map(|t| t.bar_returns.iter().copied())
            .collect();
        self.inner.apply(&flat)
    }

    fn is_ratio_statistic(&self) -> bool {
        self.inner.is_ratio_statistic()
    }

    fn support(&self) -> StatisticSupport {
        self.inner.support()
    }
}
