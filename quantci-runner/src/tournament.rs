//! `StrategyAutoBootstrap`: runs every enabled engine on one return series
//! and lets the selector pick the interval.

use std::io::Write;
use std::marker::PhantomData;

use crate::engines::{
    BasicBootstrap, BcaBootstrap, IntervalType, MOutOfNPercentileBootstrap, NormalBootstrap,
    PercentileBootstrap, PercentileTBootstrap, MIN_INNER,
};
use crate::error::BootstrapError;
use crate::factory::{SeedCoordinates, TradingBootstrapFactory};
use crate::selector::{
    AutoBootstrapSelector, AutoCiResult, Candidate, MethodId, ScoringWeights,
};
use quantci_core::{
    FromBlockSize, Resampler, Statistic, ThreadPoolExecutor, TradeRecord,
};

/// Fixed subsample ratio for trade-level M-out-of-N. The adaptive policy
/// needs ~8+ scalar observations for its Hill/skewness fit, which trade
/// populations often cannot provide; 0.75 is a conservative default.
const TRADE_LEVEL_MOUTOFN_RATIO: f64 = 0.75;

/// Practical cap on Percentile-T inner replications.
const MAX_INNER: usize = 2000;

/// Outer/inner ratio used when deriving the Percentile-T inner count.
const PERCENTILE_T_INNER_RATIO: f64 = 10.0;

/// Immutable bootstrap parameters for a single strategy/statistic.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BootstrapConfiguration {
    pub num_replications: usize,
    pub block_size: usize,
    pub confidence_level: f64,
    pub stage_tag: u64,
    pub fold: u64,
    pub rescale_m_out_of_n: bool,
}

impl BootstrapConfiguration {
    pub fn new(
        num_replications: usize,
        block_size: usize,
        confidence_level: f64,
        stage_tag: u64,
        fold: u64,
    ) -> Self {
        Self {
            num_replications,
            block_size,
            confidence_level,
            stage_tag,
            fold,
            rescale_m_out_of_n: true,
        }
    }

    /// Outer replication count for Percentile-T (equals B).
    pub fn percentile_t_outer(&self) -> usize {
        self.num_replications
    }

    /// Inner replication count for Percentile-T: `B_outer / ratio` clamped
    /// to `[MIN_INNER, 2000]`. A nonsensical ratio falls back to the
    /// minimum workable inner size.
    pub fn percentile_t_inner(&self, ratio: f64) -> usize {
        if !ratio.is_finite() || ratio <= 0.0 {
            return MIN_INNER.min(MAX_INNER);
        }
        let inner = self.num_replications as f64 / ratio;
        (inner as usize).clamp(MIN_INNER, MAX_INNER)
    }
}

/// Which bootstrap algorithms the tournament runs. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BootstrapAlgorithmsConfiguration {
    pub enable_normal: bool,
    pub enable_basic: bool,
    pub enable_percentile: bool,
    pub enable_m_out_of_n: bool,
    pub enable_percentile_t: bool,
    pub enable_bca: bool,
}

impl Default for BootstrapAlgorithmsConfiguration {
    fn default() -> Self {
        Self {
            enable_normal: true,
            enable_basic: true,
            enable_percentile: true,
            enable_m_out_of_n: true,
            enable_percentile_t: true,
            enable_bca: true,
        }
    }
}

/// Sample kinds the tournament can run on.
///
/// The M-out-of-N dispatch differs by kind at compile time: bar-level
/// (`f64`) samples get the tail-adaptive ratio policy, trade-level samples
/// a fixed conservative ratio (the adaptive constructor does not exist for
/// them).
pub trait BootstrapSample: Clone + Send + Sync + Sized {
    fn m_out_of_n_engine<R>(
        b: usize,
        cl: f64,
        resampler: R,
        rescale: bool,
        interval_type: IntervalType,
    ) -> Result<MOutOfNPercentileBootstrap<Self, R, ThreadPoolExecutor>, BootstrapError>;
}

impl BootstrapSample for f64 {
    fn m_out_of_n_engine<R>(
        b: usize,
        cl: f64,
        resampler: R,
        rescale: bool,
        interval_type: IntervalType,
    ) -> Result<MOutOfNPercentileBootstrap<Self, R, ThreadPoolExecutor>, BootstrapError> {
        MOutOfNPercentileBootstrap::adaptive(b, cl, resampler, rescale, interval_type)
    }
}

impl BootstrapSample for TradeRecord {
    fn m_out_of_n_engine<R>(
        b: usize,
        cl: f64,
        resampler: R,
        rescale: bool,
        interval_type: IntervalType,
    ) -> Result<MOutOfNPercentileBootstrap<Self, R, ThreadPoolExecutor>, BootstrapError> {
        MOutOfNPercentileBootstrap::new(
            b,
            cl,
            TRADE_LEVEL_MOUTOFN_RATIO,
            resampler,
            rescale,
            interval_type,
        )
    }
}

/// Runs every enabled bootstrap engine on a return series, converts each
/// result into a selector candidate, and returns the selector's choice with
/// full diagnostics.
///
/// Engine failures are caught and (when a log sink is supplied) reported;
/// they do not abort the tournament. If nothing survives, the run fails
/// with [`BootstrapError::NoCandidateSucceeded`].
pub struct StrategyAutoBootstrap<S, R> {
    factory: TradingBootstrapFactory,
    strategy_hash: u64,
    config: BootstrapConfiguration,
    algorithms: BootstrapAlgorithmsConfiguration,
    sampler: S,
    interval_type: IntervalType,
    _resampler: PhantomData<R>,
}

impl<S, R> StrategyAutoBootstrap<S, R> {
    pub fn new(
        factory: TradingBootstrapFactory,
        strategy_hash: u64,
        config: BootstrapConfiguration,
        algorithms: BootstrapAlgorithmsConfiguration,
        sampler: S,
        interval_type: IntervalType,
    ) -> Self {
        Self {
            factory,
            strategy_hash,
            config,
            algorithms,
            sampler,
            interval_type,
            _resampler: PhantomData,
        }
    }

    fn coords(&self) -> SeedCoordinates {
        SeedCoordinates {
            strategy_hash: self.strategy_hash,
            stage_tag: self.config.stage_tag,
            block_size: self.config.block_size as u64,
            fold: self.config.fold,
        }
    }

    /// Run the tournament.
    pub fn run<T>(
        &self,
        returns: &[T],
        mut os: Option<&mut dyn Write>,
    ) -> Result<AutoCiResult, BootstrapError>
    where
        T: BootstrapSample,
        S: Statistic<T> + Sync,
        R: Resampler<T> + FromBlockSize + Clone + Sync,
    {
        if returns.len() < 2 {
            return Err(BootstrapError::invalid(
                "StrategyAutoBootstrap",
                format!("requires at least 2 returns (got {})", returns.len()),
            ));
        }

        let b = self.config.num_replications;
        let cl = self.config.confidence_level;
        let coords = self.coords();
        let resampler = R::from_block_size(self.config.block_size);
        let weights = ScoringWeights::for_statistic(self.sampler.is_ratio_statistic());

        let mut candidates: Vec<Candidate> = Vec::with_capacity(6);

        // 1) Normal bootstrap
        if self.algorithms.enable_normal {
            let attempt = (|| -> Result<Candidate, BootstrapError> {
                let (engine, crn) = self.factory.make_normal::<R, ThreadPoolExecutor>(
                    b,
                    cl,
                    resampler.clone(),
                    coords,
                    self.interval_type,
                )?;
                let res = engine.run(returns, &self.sampler, &crn)?;
                let diag = engine.diagnostics()?;
                Ok(AutoBootstrapSelector::summarize_percentile_like(
                    MethodId::Normal,
                    &res,
                    &diag,
                ))
            })();
            Self::absorb(attempt, NormalBootstrap::<R>::NAME, &mut candidates, &mut os);
        }

        // 2) Basic bootstrap
        if self.algorithms.enable_basic {
            let attempt = (|| -> Result<Candidate, BootstrapError> {
                let (mut engine, crn) = self.factory.make_basic::<R, ThreadPoolExecutor>(
                    b,
                    cl,
                    resampler.clone(),
                    coords,
                    self.interval_type,
                )?;
                let res = engine.run(returns, &self.sampler, &crn)?;
                let diag = engine.diagnostics()?.clone();
                Ok(AutoBootstrapSelector::summarize_percentile_like(
                    MethodId::Basic,
                    &res,
                    &diag,
                ))
            })();
            Self::absorb(attempt, BasicBootstrap::<R>::NAME, &mut candidates, &mut os);
        }

        // 3) Percentile bootstrap
        if self.algorithms.enable_percentile {
            let attempt = (|| -> Result<Candidate, BootstrapError> {
                let (engine, crn) = self.factory.make_percentile::<R, ThreadPoolExecutor>(
                    b,
                    cl,
                    resampler.clone(),
                    coords,
                    self.interval_type,
                )?;
                let res = engine.run(returns, &self.sampler, &crn)?;
                let diag = engine.diagnostics()?;
                Ok(AutoBootstrapSelector::summarize_percentile_like(
                    MethodId::Percentile,
                    &res,
                    &diag,
                ))
            })();
            Self::absorb(
                attempt,
                PercentileBootstrap::<R>::NAME,
                &mut candidates,
                &mut os,
            );
        }

        // 4) M-out-of-N percentile bootstrap (sample-kind dispatch)
        if self.algorithms.enable_m_out_of_n {
            let attempt = (|| -> Result<Candidate, BootstrapError> {
                let mut engine = T::m_out_of_n_engine(
                    b,
                    cl,
                    resampler.clone(),
                    self.config.rescale_m_out_of_n,
                    self.interval_type,
                )?;
                let crn = self.factory.provider(coords);
                let res = engine.run(returns, &self.sampler, &crn)?;
                let diag = engine.diagnostics()?.clone();
                Ok(AutoBootstrapSelector::summarize_percentile_like(
                    MethodId::MOutOfN,
                    &res,
                    &diag,
                ))
            })();
            Self::absorb(
                attempt,
                MOutOfNPercentileBootstrap::<T, R>::NAME,
                &mut candidates,
                &mut os,
            );
        }

        // 5) Percentile-T (double bootstrap)
        if self.algorithms.enable_percentile_t {
            let attempt = (|| -> Result<Candidate, BootstrapError> {
                let (mut engine, crn) = self.factory.make_percentile_t::<R, ThreadPoolExecutor>(
                    self.config.percentile_t_outer(),
                    self.config.percentile_t_inner(PERCENTILE_T_INNER_RATIO),
                    cl,
                    resampler.clone(),
                    coords,
                    self.interval_type,
                )?;
                let res = engine.run(returns, &self.sampler, &crn)?;
                let diag = engine.diagnostics()?.clone();
                Ok(AutoBootstrapSelector::summarize_percentile_t(&res, &diag))
            })();
            Self::absorb(
                attempt,
                PercentileTBootstrap::<R>::NAME,
                &mut candidates,
                &mut os,
            );
        }

        // 6) BCa
        if self.algorithms.enable_bca {
            let attempt = (|| -> Result<Candidate, BootstrapError> {
                let (mut engine, crn) = self.factory.make_bca::<R, ThreadPoolExecutor>(
                    b,
                    cl,
                    resampler.clone(),
                    coords,
                    self.interval_type,
                )?;
                let res = engine.run(returns, &self.sampler, &crn)?;
                let diag = engine.diagnostics()?.clone();
                Ok(AutoBootstrapSelector::summarize_bca(&res, &diag))
            })();
            Self::absorb(attempt, BcaBootstrap::<R>::NAME, &mut candidates, &mut os);
        }

        if candidates.is_empty() {
            return Err(BootstrapError::NoCandidateSucceeded);
        }

        let support = self.sampler.support();
        let result = AutoBootstrapSelector::select(candidates, weights, support)?;

        if let Some(w) = os.as_deref_mut() {
            Self::log_selection(w, &result);
        }

        Ok(result)
    }

    fn absorb(
        attempt: Result<Candidate, BootstrapError>,
        engine_name: &str,
        candidates: &mut Vec<Candidate>,
        os: &mut Option<&mut dyn Write>,
    ) {
        match attempt {
            Ok(c) => candidates.push(c),
            Err(e) => {
                if let Some(w) = os.as_deref_mut() {
                    let _ = writeln!(w, "   [AutoCI] {engine_name} failed: {e}");
                }
            }
        }
    }

    fn log_selection(w: &mut dyn Write, result: &AutoCiResult) {
        let chosen = &result.chosen;
        let diagnostics = &result.diagnostics;

        if diagnostics.chosen_method == MethodId::MOutOfN {
            let _ = writeln!(w, "\n[!] CRITICAL: Safety Valve Triggered (M-out-of-N chosen)");
            let _ = writeln!(w, "--------------------------------------------------------");
            for cand in &result.candidates {
                if cand.method == MethodId::BCa {
                    let z0 = cand.z0.unwrap_or(0.0);
                    let accel = cand.accel.unwrap_or(0.0);
                    let _ = writeln!(w, "    BCa Stats (REJECTED):");
                    let _ = writeln!(w, "    - z0 (Bias): {z0}");
                    let _ = writeln!(w, "    - a (Accel): {accel}");
                    let _ = writeln!(w, "    - Stability Penalty: {}", cand.stability_penalty);
                    let _ = writeln!(w, "    - Normalized Length: {}", cand.normalized_length());
                    if z0.abs() > 0.4 {
                        let _ = writeln!(w, "    -> DIAGNOSIS: Excessive Bias (z0 > 0.4)");
                    }
                    if accel.abs() > 0.1 {
                        let _ =
                            writeln!(w, "    -> DIAGNOSIS: Excessive Skew Sensitivity (a > 0.1)");
                    }
                }
                if cand.method == MethodId::Percentile {
                    let _ = writeln!(w, "    Percentile Stats:");
                    let _ = writeln!(w, "    - Skewness: {}", cand.skew_boot);
                    let _ = writeln!(w, "    - Length Penalty: {}", cand.length_penalty);
                }
            }
            let _ = writeln!(w, "--------------------------------------------------------\n");
        }

        let _ = writeln!(
            w,
            "   [AutoCI] Selected method={}  mean={}  LB={}  UB={}  n={}  B_eff={}  z0={}  a={}",
            diagnostics.chosen_method.as_str(),
            chosen.mean,
            chosen.lower,
            chosen.upper,
            chosen.n,
            chosen.b_effective,
            chosen.z0.unwrap_or(0.0),
            chosen.accel.unwrap_or(0.0),
        );

        let _ = writeln!(
            w,
            "   [AutoCI] Diagnostics: score={}  stability_penalty={}  length_penalty={}  hasBCa={}  bcaChosen={}  bcaRejectedInstability={}  bcaRejectedLength={}  numCandidates={}",
            diagnostics.chosen_score,
            diagnostics.chosen_stability_penalty,
            diagnostics.chosen_length_penalty,
            diagnostics.has_bca,
            diagnostics.bca_chosen,
            diagnostics.bca_rejected_for_instability,
            diagnostics.bca_rejected_for_length,
            diagnostics.num_candidates,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_stores_core_fields() {
        let cfg = BootstrapConfiguration::new(2500, 5, 0.95, 3, 1);
        assert_eq!(cfg.num_replications, 2500);
        assert_eq!(cfg.block_size, 5);
        assert_eq!(cfg.confidence_level, 0.95);
        assert_eq!(cfg.stage_tag, 3);
        assert_eq!(cfg.fold, 1);
        assert!(cfg.rescale_m_out_of_n);
    }

    #[test]
    fn percentile_t_outer_equals_b() {
        let cfg = BootstrapConfiguration::new(1500, 3, 0.95, 0, 0);
        assert_eq!(cfg.percentile_t_outer(), 1500);
    }

    #[test]
    fn percentile_t_inner_clamps_to_workable_range() {
        let cfg = BootstrapConfiguration::new(2000, 3, 0.95, 0, 0);
        assert_eq!(cfg.percentile_t_inner(10.0), 200);

        // Tiny B: floor at MIN_INNER.
        let tiny = BootstrapConfiguration::new(400, 3, 0.95, 0, 0);
        assert_eq!(tiny.percentile_t_inner(100.0), MIN_INNER);

        // Huge B with small ratio: cap at 2000.
        let huge = BootstrapConfiguration::new(100_000, 3, 0.95, 0, 0);
        assert_eq!(huge.percentile_t_inner(2.0), 2000);
    }

    #[test]
    fn percentile_t_inner_nonsense_ratio_falls_back() {
        let cfg = BootstrapConfiguration::new(2000, 3, 0.95, 0, 0);
        assert_eq!(cfg.percentile_t_inner(0.0), MIN_INNER);
        assert_eq!(cfg.percentile_t_inner(-3.0), MIN_INNER);
        assert_eq!(cfg.percentile_t_inner(f64::NAN), MIN_INNER);
    }

    #[test]
    fn algorithms_default_to_all_enabled() {
        let a = BootstrapAlgorithmsConfiguration::default();
        assert!(a.enable_normal);
        assert!(a.enable_basic);
        assert!(a.enable_percentile);
        assert!(a.enable_m_out_of_n);
        assert!(a.enable_percentile_t);
        assert!(a.enable_bca);
    }
}
