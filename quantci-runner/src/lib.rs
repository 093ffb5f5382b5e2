//! # QuantCI Runner
//!
//! Bootstrap confidence-interval engines and the selection tournament for
//! trading-strategy evaluation.
//!
//! ## Components
//!
//! - `engines`: the six CI constructions (Normal, Basic, Percentile,
//!   M-out-of-N, Percentile-T, BCa) over pluggable resamplers and statistics
//! - `selector`: scores candidate intervals and picks one, with domain
//!   penalties for ratio statistics and acceptance gates for BCa
//! - `factory`: pairs each engine with its deterministic RNG provider
//! - `tournament`: `StrategyAutoBootstrap` — runs the enabled engines,
//!   routes diagnostics to a caller-supplied log sink, returns the choice
//! - `bounds`: `BoundFutureReturns` — conservative monthly return quantile
//!   bounds via BCa

pub mod bounds;
pub mod engines;
pub mod error;
pub mod factory;
pub mod selector;
pub mod tournament;

pub use bounds::{
    empirical_quantile, heuristic_block_length, monthly_returns_from_closed_positions,
    BoundFutureReturns, BoundFutureReturnsParams, BoundPolicy, ClosedPosition, PositionSide,
    QuantileCi,
};
pub use engines::{
    choose_subsample_ratio, BasicBootstrap, BcaBootstrap, BcaResult, BootstrapDiagnostics,
    EngineResult, IntervalType, MOutOfNPercentileBootstrap, NormalBootstrap, PercentileBootstrap,
    PercentileTBootstrap, MIN_INNER,
};
pub use error::BootstrapError;
pub use factory::{SeedCoordinates, TradingBootstrapFactory};
pub use selector::{
    AutoBootstrapSelector, AutoCiResult, Candidate, MethodId, ScoringWeights, SelectionDiagnostics,
};
pub use tournament::{
    BootstrapAlgorithmsConfiguration, BootstrapConfiguration, BootstrapSample,
    StrategyAutoBootstrap,
};
