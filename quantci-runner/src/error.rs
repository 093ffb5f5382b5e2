//! Error taxonomy for the bootstrap engines and tournament.
//!
//! Failures are always errors, never sentinel values, and every
//! engine-originated error names the engine that failed.

use quantci_core::{CoreError, ResampleError, StatisticError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BootstrapError {
    /// Malformed construction or run parameters (B, confidence level, sample
    /// size, subsample ratio, quantile probabilities, ...).
    #[error("{engine}: invalid argument: {reason}")]
    InvalidArgument { engine: &'static str, reason: String },

    /// Fewer than half of the requested replicates produced finite
    /// statistics.
    #[error("{engine}: too many degenerate replicates ({usable} usable of {requested})")]
    DegenerateReplicates {
        engine: &'static str,
        usable: usize,
        requested: usize,
    },

    /// A diagnostic getter was called before a successful `run()`.
    #[error("{engine}: diagnostics are not available: run() has not completed on this instance")]
    DiagnosticsUnavailable { engine: &'static str },

    /// The statistic hit an undefined value on the original sample under a
    /// strict policy.
    #[error("{engine}: {source}")]
    Domain {
        engine: &'static str,
        source: StatisticError,
    },

    /// Every enabled engine failed in one tournament.
    #[error("no bootstrap candidate succeeded")]
    NoCandidateSucceeded,
}

impl BootstrapError {
    pub fn invalid(engine: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            engine,
            reason: reason.into(),
        }
    }

    pub(crate) fn from_resample(engine: &'static str, err: ResampleError) -> Self {
        Self::InvalidArgument {
            engine,
            reason: err.to_string(),
        }
    }

    pub(crate) fn from_statistic(engine: &'static str, err: StatisticError) -> Self {
        match err {
            StatisticError::InvalidArgument { .. } => Self::InvalidArgument {
                engine,
                reason: err.to_string(),
            },
            StatisticError::Domain { .. } => Self::Domain {
                engine,
                source: err,
            },
        }
    }

    pub(crate) fn from_core(engine: &'static str, err: CoreError) -> Self {
        match err {
            CoreError::Resample(e) => Self::from_resample(engine, e),
            CoreError::Statistic(e) => Self::from_statistic(engine, e),
        }
    }
}
