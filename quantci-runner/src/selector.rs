//! Tournament selector: scores candidate intervals from the six engines and
//! picks one.
//!
//! Scoring is additive over four penalties (center shift, bootstrap
//! skewness, normalized length, shape stability), with weights depending on
//! whether the statistic is a ratio. Ratio statistics additionally get a
//! domain penalty on candidates whose lower bound leaves the support, and
//! BCa must pass acceptance gates on its bias/acceleration diagnostics and
//! its normalized length before it can win.

use crate::engines::{BcaResult, BootstrapDiagnostics, EngineResult};
use crate::error::BootstrapError;
use quantci_core::{skewness, StatisticSupport};
use serde::{Deserialize, Serialize};

/// Floor for the robust dispersion scale so degenerate distributions do not
/// divide by zero.
const SCALE_EPS: f64 = 1e-12;

/// Additive penalty disqualifying out-of-domain candidates for ratio
/// statistics (unless every candidate is out of domain). Dominates the BCa
/// rejection penalty: an in-domain candidate beats an out-of-domain one even
/// when it failed a BCa gate.
const DOMAIN_PENALTY: f64 = 1e12;

/// Additive penalty applied to a BCa candidate that fails an acceptance
/// gate; large enough that a gated BCa never outscores an ungated rival.
const BCA_REJECT_PENALTY: f64 = 1e9;

/// BCa acceptance gates.
const BCA_MAX_ABS_Z0: f64 = 0.4;
const BCA_MAX_ABS_ACCEL: f64 = 0.1;
const BCA_MAX_LENGTH_RATIO: f64 = 1.75;

/// Identifies which engine produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodId {
    Normal,
    Basic,
    Percentile,
    MOutOfN,
    PercentileT,
    BCa,
}

impl MethodId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Basic => "Basic",
            Self::Percentile => "Percentile",
            Self::MOutOfN => "MOutOfN",
            Self::PercentileT => "PercentileT",
            Self::BCa => "BCa",
        }
    }

    /// Tie-break preference (lower wins ties).
    fn preference(&self) -> u8 {
        match self {
            Self::BCa => 0,
            Self::PercentileT => 1,
            Self::Percentile => 2,
            Self::Basic => 3,
            Self::Normal => 4,
            Self::MOutOfN => 5,
        }
    }
}

/// One engine's interval plus the diagnostics the selector scores on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub method: MethodId,
    /// θ̂ on the original sample.
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub cl: f64,
    pub b_requested: usize,
    pub b_effective: usize,
    pub b_skipped: usize,
    pub n: usize,
    pub l: usize,
    pub se_boot: f64,
    /// Mean of the bootstrap distribution (drives the center-shift term).
    pub mean_boot: f64,
    /// Skewness of the bootstrap distribution.
    pub skew_boot: f64,
    /// BCa bias correction, when the method estimates one.
    pub z0: Option<f64>,
    /// BCa acceleration, when the method estimates one.
    pub accel: Option<f64>,
    /// Interval length over the robust scale.
    pub length_penalty: f64,
    /// `|z0| + 10·|a|` for BCa, 0 otherwise.
    pub stability_penalty: f64,
    /// Filled by [`AutoBootstrapSelector::select`]; lower is better.
    pub score: f64,
}

impl Candidate {
    fn scale(se_boot: f64) -> f64 {
        se_boot.max(SCALE_EPS)
    }

    fn center_shift(&self) -> f64 {
        (self.mean_boot - self.mean).abs() / Self::scale(self.se_boot)
    }

    /// Interval length normalized by the robust scale.
    pub fn normalized_length(&self) -> f64 {
        self.length_penalty
    }

    fn is_percentile_like(&self) -> bool {
        matches!(
            self.method,
            MethodId::Normal | MethodId::Basic | MethodId::Percentile | MethodId::MOutOfN
        )
    }
}

/// Scoring weights; two standard regimes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub w_center_shift: f64,
    pub w_skew: f64,
    pub w_length: f64,
    pub w_stability: f64,
}

impl ScoringWeights {
    /// Ratio statistics: favor stable, short intervals over skew
    /// sensitivity.
    pub fn ratio() -> Self {
        Self {
            w_center_shift: 0.25,
            w_skew: 0.5,
            w_length: 0.75,
            w_stability: 1.5,
        }
    }

    /// Non-ratio statistics.
    pub fn non_ratio() -> Self {
        Self {
            w_center_shift: 1.0,
            w_skew: 0.5,
            w_length: 0.25,
            w_stability: 1.0,
        }
    }

    pub fn for_statistic(is_ratio: bool) -> Self {
        if is_ratio {
            Self::ratio()
        } else {
            Self::non_ratio()
        }
    }
}

/// Selection diagnostics surfaced alongside the chosen candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDiagnostics {
    pub chosen_method: MethodId,
    pub chosen_score: f64,
    pub has_bca: bool,
    pub bca_chosen: bool,
    pub bca_rejected_for_instability: bool,
    pub bca_rejected_for_length: bool,
    pub num_candidates: usize,
    pub chosen_stability_penalty: f64,
    pub chosen_length_penalty: f64,
}

/// Tournament outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCiResult {
    pub chosen: Candidate,
    pub candidates: Vec<Candidate>,
    pub diagnostics: SelectionDiagnostics,
}

impl AutoCiResult {
    pub fn chosen_method(&self) -> MethodId {
        self.diagnostics.chosen_method
    }
}

/// Builds candidates from engine output and selects among them.
pub struct AutoBootstrapSelector;

impl AutoBootstrapSelector {
    /// Candidate from a percentile-like engine (Normal, Basic, Percentile,
    /// M-out-of-N): no shape diagnostics, zero stability penalty.
    pub fn summarize_percentile_like(
        method: MethodId,
        res: &EngineResult,
        diag: &BootstrapDiagnostics,
    ) -> Candidate {
        Self::candidate(method, res, diag, None, None)
    }

    /// Candidate from the Percentile-T engine (summarized off its outer
    /// distribution).
    pub fn summarize_percentile_t(res: &EngineResult, diag: &BootstrapDiagnostics) -> Candidate {
        Self::candidate(MethodId::PercentileT, res, diag, None, None)
    }

    /// Candidate from the BCa engine; carries z0/acceleration and the
    /// stability penalty `|z0| + 10·|a|`.
    pub fn summarize_bca(res: &BcaResult, diag: &BootstrapDiagnostics) -> Candidate {
        Self::candidate(
            MethodId::BCa,
            &res.base,
            diag,
            Some(res.z0),
            Some(res.accel),
        )
    }

    fn candidate(
        method: MethodId,
        res: &EngineResult,
        diag: &BootstrapDiagnostics,
        z0: Option<f64>,
        accel: Option<f64>,
    ) -> Candidate {
        let scale = Candidate::scale(res.se_boot);
        let stability_penalty = match (z0, accel) {
            (Some(z0), Some(a)) => z0.abs() + 10.0 * a.abs(),
            _ => 0.0,
        };
        Candidate {
            method,
            mean: res.mean,
            lower: res.lower,
            upper: res.upper,
            cl: res.cl,
            b_requested: res.b_requested,
            b_effective: res.b_effective,
            b_skipped: res.b_skipped,
            n: res.n,
            l: res.l,
            se_boot: res.se_boot,
            mean_boot: diag.mean_boot,
            skew_boot: skewness(&diag.stats),
            z0,
            accel,
            length_penalty: (res.upper - res.lower) / scale,
            stability_penalty,
            score: 0.0,
        }
    }

    /// Score all candidates and pick the winner.
    ///
    /// Fails with [`BootstrapError::NoCandidateSucceeded`] on an empty
    /// candidate list.
    pub fn select(
        mut candidates: Vec<Candidate>,
        weights: ScoringWeights,
        support: StatisticSupport,
    ) -> Result<AutoCiResult, BootstrapError> {
        if candidates.is_empty() {
            return Err(BootstrapError::NoCandidateSucceeded);
        }

        let any_in_domain = match support {
            StatisticSupport::StrictlyPositive => candidates.iter().any(|c| c.lower > 0.0),
            _ => true,
        };

        // Median normalized length of the percentile-like field, for the
        // BCa length gate.
        let median_pct_length = {
            let mut lengths: Vec<f64> = candidates
                .iter()
                .filter(|c| c.is_percentile_like())
                .map(|c| c.length_penalty)
                .collect();
            if lengths.is_empty() {
                None
            } else {
                lengths.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                Some(quantci_core::quantile_type7_sorted(&lengths, 0.5))
            }
        };

        let mut bca_rejected_for_instability = false;
        let mut bca_rejected_for_length = false;

        for c in candidates.iter_mut() {
            let mut score = weights.w_center_shift * c.center_shift()
                + weights.w_skew * c.skew_boot.abs()
                + weights.w_length * c.length_penalty
                + weights.w_stability * c.stability_penalty;

            if support == StatisticSupport::StrictlyPositive
                && any_in_domain
                && c.lower <= 0.0
            {
                score += DOMAIN_PENALTY;
            }

            if c.method == MethodId::BCa {
                let z0 = c.z0.unwrap_or(0.0);
                let a = c.accel.unwrap_or(0.0);
                if z0.abs() > BCA_MAX_ABS_Z0 || a.abs() > BCA_MAX_ABS_ACCEL {
                    bca_rejected_for_instability = true;
                    score += BCA_REJECT_PENALTY;
                }
                if let Some(median) = median_pct_length {
                    if median > 0.0 && c.length_penalty > BCA_MAX_LENGTH_RATIO * median {
                        bca_rejected_for_length = true;
                        score += BCA_REJECT_PENALTY;
                    }
                }
            }

            c.score = score;
        }

        let chosen = candidates
            .iter()
            .min_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.method.preference().cmp(&b.method.preference()))
            })
            .cloned()
            .ok_or(BootstrapError::NoCandidateSucceeded)?;

        let has_bca = candidates.iter().any(|c| c.method == MethodId::BCa);
        let diagnostics = SelectionDiagnostics {
            chosen_method: chosen.method,
            chosen_score: chosen.score,
            has_bca,
            bca_chosen: chosen.method == MethodId::BCa,
            bca_rejected_for_instability,
            bca_rejected_for_length,
            num_candidates: candidates.len(),
            chosen_stability_penalty: chosen.stability_penalty,
            chosen_length_penalty: chosen.length_penalty,
        };

        Ok(AutoCiResult {
            chosen,
            candidates,
            diagnostics,
        })
    }
}
