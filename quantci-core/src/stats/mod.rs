//! Statistic functors evaluated on (resampled) return series.
//!
//! Every statistic is a pure, deterministic function of its input slice.
//! Statistics additionally declare whether they live on a ratio domain
//! (which changes how the tournament selector weighs them) and the support
//! of their output.

mod describe;
mod location;
mod profit;
mod quantile;
mod sharpe;

pub use describe::{mean, sample_std, sample_variance, skewness};
pub use location::{GeometricMeanStat, MeanStat, RuinPolicy};
pub use profit::{
    profitability_pair, LogProfitFactorStat, ProfitFactorStat, ProfitabilityStat,
    RobustLogProfitFactorStat, PF_SENTINEL,
};
pub use quantile::{quantile_type7_sorted, quantile_type7_unsorted, QuantileStat};
pub use sharpe::SharpeStat;

use crate::error::StatisticError;
use serde::{Deserialize, Serialize};

/// Declared range of a statistic's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatisticSupport {
    Unbounded,
    StrictlyPositive,
    ClosedUnitInterval,
}

/// A statistic over samples of element type `T`.
///
/// `apply` must be deterministic given its input. A statistic may discard
/// elements that violate its domain (each implementation documents its skip
/// policy); under a strict policy it returns a
/// [`Domain`](StatisticError::Domain) error instead.
pub trait Statistic<T> {
    fn apply(&self, xs: &[T]) -> Result<f64, StatisticError>;

    /// True when the statistic lives on a ratio / log-ratio domain.
    fn is_ratio_statistic(&self) -> bool {
        false
    }

    fn support(&self) -> StatisticSupport {
        StatisticSupport::Unbounded
    }
}
