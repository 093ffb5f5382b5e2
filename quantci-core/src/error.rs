//! Error types for resampling and statistic evaluation.

use thiserror::Error;

/// Errors raised by resamplers and the jackknife adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    #[error("{context}: {reason}")]
    InvalidArgument {
        context: &'static str,
        reason: String,
    },
}

impl ResampleError {
    pub fn invalid(context: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            context,
            reason: reason.into(),
        }
    }
}

/// Errors raised by statistic functors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticError {
    #[error("{statistic}: invalid argument: {reason}")]
    InvalidArgument {
        statistic: &'static str,
        reason: String,
    },
    /// The statistic hit an undefined value (e.g. log of a non-positive
    /// quantity) and its policy is strict.
    #[error("{statistic}: domain violation: {reason}")]
    Domain {
        statistic: &'static str,
        reason: String,
    },
}

impl StatisticError {
    pub fn invalid(statistic: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            statistic,
            reason: reason.into(),
        }
    }

    pub fn domain(statistic: &'static str, reason: impl Into<String>) -> Self {
        Self::Domain {
            statistic,
            reason: reason.into(),
        }
    }
}

/// Union of core errors, for call sites (like the jackknife) that mix
/// resampling guards with statistic evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error(transparent)]
    Statistic(#[from] StatisticError),
}
