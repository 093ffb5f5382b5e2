//! # QuantCI Core
//!
//! Resampling primitives for bootstrap confidence intervals on trading
//! returns.
//!
//! ## Components
//!
//! - `rng`: deterministic per-replicate RNG construction (CRN provider,
//!   seed-list provider)
//! - `executor`: chunked fork-join over replicate indices
//! - `resample`: i.i.d. and stationary-bootstrap resamplers, restart mask,
//!   delete-block jackknife adapter
//! - `stats`: statistic functors (mean, geometric mean, profit-factor
//!   family, quantile, Sharpe) with ratio/support declarations
//! - `trade`: trade-level samples

pub mod error;
pub mod executor;
pub mod resample;
pub mod rng;
pub mod stats;
pub mod trade;

pub use error::{CoreError, ResampleError, StatisticError};
pub use executor::{parallel_for_chunked, Executor, SingleThreadExecutor, ThreadPoolExecutor};
pub use resample::{
    make_restart_mask, BlockResamplerAdapter, FromBlockSize, IidResampler, Resampler,
    StationaryBlockValueResampler, StationaryMaskIndexResampler, StationaryMaskValueResampler,
};
pub use rng::{CrnProvider, EngineProvider, SeedListProvider};
pub use stats::{
    mean, profitability_pair, quantile_type7_sorted, quantile_type7_unsorted, sample_std,
    sample_variance, skewness, GeometricMeanStat, LogProfitFactorStat, MeanStat, ProfitFactorStat,
    ProfitabilityStat, QuantileStat, RobustLogProfitFactorStat, RuinPolicy, SharpeStat, Statistic,
    StatisticSupport, PF_SENTINEL,
};
pub use trade::{TradeCompound, TradeRecord};
