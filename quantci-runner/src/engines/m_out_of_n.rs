//! M-out-of-N percentile bootstrap with optional adaptive subsample ratio.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engines::{
    collect_replicates, direct_tail_probs, ensure_enough_replicates, validate_engine_params,
    BootstrapDiagnostics, EngineResult, IntervalType,
};
use crate::error::BootstrapError;
use quantci_core::{
    quantile_type7_unsorted, skewness, EngineProvider, Executor, Resampler, SeedListProvider,
    SingleThreadExecutor, Statistic,
};
use rand::rngs::StdRng;

/// Minimum observations for the Hill tail fit; below this the adaptive
/// policy falls back to the fixed conservative ratio.
const MIN_TAIL_OBSERVATIONS: usize = 8;

/// Conservative fallback ratio, also used at trade level.
const FALLBACK_RATIO: f64 = 0.75;

/// Pick a subsample ratio from the tail heaviness and skewness of `x`.
///
/// Heavier tails and stronger skew call for a smaller `m` (the subsampling
/// regime where m-out-of-n is consistent when n-out-of-n is not): starting
/// from 0.95, the ratio steps down as the Hill tail index over the top-10%
/// absolute tail drops below 4 and then 2, minus a capped skewness term,
/// clamped to `[0.5, 0.95]`. Samples too small for a meaningful tail fit
/// (fewer than 8 nonzero observations) get 0.75.
pub fn choose_subsample_ratio(x: &[f64]) -> f64 {
    if x.len() < MIN_TAIL_OBSERVATIONS {
        return FALLBACK_RATIO;
    }

    let mut abs: Vec<f64> = x.iter().map(|v| v.abs()).filter(|v| *v > 0.0).collect();
    if abs.len() < MIN_TAIL_OBSERVATIONS {
        return FALLBACK_RATIO;
    }
    abs.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    // Hill estimator over the top 10% of absolute values (at least 4 points).
    let k = (abs.len() / 10).max(4).min(abs.len() - 1);
    let threshold = abs[k];
    if threshold <= 0.0 {
        return FALLBACK_RATIO;
    }
    let hill_mean = abs[..k]
        .iter()
        .map(|v| (v / threshold).ln())
        .sum::<f64>()
        / k as f64;
    let tail_index = if hill_mean > 0.0 {
        1.0 / hill_mean
    } else {
        f64::INFINITY
    };

    let mut rho = 0.95;
    if tail_index < 4.0 {
        rho -= 0.10;
    }
    if tail_index < 2.0 {
        rho -= 0.15;
    }
    rho -= 0.05 * skewness(x).abs().min(3.0);

    rho.clamp(0.5, 0.95)
}

/// How the subsample ratio is chosen for each run.
enum RatioPolicy<T> {
    Fixed(f64),
    /// Ratio computed from the sample at run time. Only constructible for
    /// scalar (bar-level) samples — see [`MOutOfNPercentileBootstrap::adaptive`].
    Adaptive(fn(&[T]) -> f64),
}

impl<T> std::fmt::Debug for RatioPolicy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(r) => f.debug_tuple("Fixed").field(r).finish(),
            Self::Adaptive(_) => f.write_str("Adaptive"),
        }
    }
}

/// Percentile bootstrap drawing `m = ⌈ρ·n⌉` observations per replicate.
///
/// With rescaling enabled the replicate quantiles are pulled toward θ̂ by
/// `√(m/n)`, correcting the subsample interval back to the n-scale:
/// `θ̂ + √(m/n)·(q − θ̂)`.
///
/// The sample element type is a struct parameter so that the adaptive ratio
/// policy (which needs scalar returns for its tail fit) exists only on the
/// `f64` instantiation; trade-level samples are restricted to fixed ratios
/// at compile time.
#[derive(Debug)]
pub struct MOutOfNPercentileBootstrap<T, R, E = SingleThreadExecutor> {
    b: usize,
    cl: f64,
    ratio: RatioPolicy<T>,
    resampler: R,
    rescale: bool,
    interval_type: IntervalType,
    exec: E,
    chunk_hint: AtomicUsize,
    diag: Option<BootstrapDiagnostics>,
}

impl<T, R, E: Executor> MOutOfNPercentileBootstrap<T, R, E> {
    pub const NAME: &'static str = "MOutOfNPercentileBootstrap";

    /// Fixed subsample ratio `ρ ∈ (0, 1]`.
    pub fn new(
        b: usize,
        confidence_level: f64,
        ratio: f64,
        resampler: R,
        rescale: bool,
        interval_type: IntervalType,
    ) -> Result<Self, BootstrapError> {
        validate_engine_params(Self::NAME, b, confidence_level)?;
        if !(ratio > 0.0 && ratio <= 1.0) || !ratio.is_finite() {
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!("subsample ratio must be in (0, 1] (got {ratio})"),
            ));
        }
        Ok(Self {
            b,
            cl: confidence_level,
            ratio: RatioPolicy::Fixed(ratio),
            resampler,
            rescale,
            interval_type,
            exec: E::default(),
            chunk_hint: AtomicUsize::new(0),
            diag: None,
        })
    }

    /// Run with a deterministic engine provider (CRN-friendly).
    pub fn run<S, P>(
        &mut self,
        x: &[T],
        stat: &S,
        provider: &P,
    ) -> Result<EngineResult, BootstrapError>
    where
        T: Clone + Sync,
        S: Statistic<T> + Sync,
        R: Resampler<T> + Sync,
        P: EngineProvider + Sync,
    {
        let n = x.len();
        if n < 3 {
            self.diag = None;
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!("n must be >= 3 (got {n})"),
            ));
        }

        let rho = match &self.ratio {
            RatioPolicy::Fixed(r) => *r,
            RatioPolicy::Adaptive(f) => f(x),
        };
        let m = (rho * n as f64).ceil() as usize;
        if m < 2 {
            self.diag = None;
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!("subsample size m = {m} too small (n = {n}, ratio = {rho})"),
            ));
        }
        let m = m.min(n);

        let theta_hat = stat
            .apply(x)
            .map_err(|e| BootstrapError::from_statistic(Self::NAME, e))?;

        let chunk_hint = self.chunk_hint.load(Ordering::Relaxed);
        let (thetas, skipped) = collect_replicates(
            x,
            m,
            stat,
            &self.resampler,
            &self.exec,
            provider,
            self.b,
            chunk_hint,
        );

        if let Err(e) = ensure_enough_replicates(Self::NAME, thetas.len(), self.b) {
            self.diag = None;
            return Err(e);
        }

        let alpha = 1.0 - self.cl;
        let (pl, pu) = direct_tail_probs(self.interval_type, alpha);
        let q_lo = quantile_type7_unsorted(&thetas, pl);
        let q_hi = quantile_type7_unsorted(&thetas, pu);

        let (lower, upper) = if self.rescale {
            let scale = (m as f64 / n as f64).sqrt();
            (
                theta_hat + scale * (q_lo - theta_hat),
                theta_hat + scale * (q_hi - theta_hat),
            )
        } else {
            (q_lo, q_hi)
        };

        let diag = BootstrapDiagnostics::from_replicates(thetas);
        let se_boot = diag.se_boot;
        let b_effective = diag.stats.len();
        self.diag = Some(diag);

        Ok(EngineResult {
            mean: theta_hat,
            lower,
            upper,
            cl: self.cl,
            b_requested: self.b,
            b_effective,
            b_skipped: skipped,
            n,
            l: <R as Resampler<T>>::get_l(&self.resampler),
            se_boot,
        })
    }

    /// Run with a caller-supplied RNG; sub-seeds are pre-drawn sequentially.
    pub fn run_with_rng<S>(
        &mut self,
        x: &[T],
        stat: &S,
        rng: &mut StdRng,
    ) -> Result<EngineResult, BootstrapError>
    where
        T: Clone + Sync,
        S: Statistic<T> + Sync,
        R: Resampler<T> + Sync,
    {
        let provider = SeedListProvider::draw(rng, self.b);
        self.run(x, stat, &provider)
    }

    /// Hint for the parallel chunk size; `0` means implementation default.
    pub fn set_chunk_size_hint(&self, hint: usize) {
        self.chunk_hint.store(hint, Ordering::Relaxed);
    }

    pub fn b(&self) -> usize {
        self.b
    }

    pub fn cl(&self) -> f64 {
        self.cl
    }

    pub fn resampler(&self) -> &R {
        &self.resampler
    }

    pub fn has_diagnostics(&self) -> bool {
        self.diag.is_some()
    }

    /// The last run's bootstrap distribution.
    pub fn diagnostics(&self) -> Result<&BootstrapDiagnostics, BootstrapError> {
        self.diag
            .as_ref()
            .ok_or(BootstrapError::DiagnosticsUnavailable { engine: Self::NAME })
    }
}

impl<R, E: Executor> MOutOfNPercentileBootstrap<f64, R, E> {
    /// Tail-volatility adaptive ratio policy (bar-level only).
    ///
    /// The ratio is recomputed from each run's sample via
    /// [`choose_subsample_ratio`]. Trade-level instantiations cannot reach
    /// this constructor; they use [`Self::new`] with a fixed ratio.
    pub fn adaptive(
        b: usize,
        confidence_level: f64,
        resampler: R,
        rescale: bool,
        interval_type: IntervalType,
    ) -> Result<Self, BootstrapError> {
        validate_engine_params(Self::NAME, b, confidence_level)?;
        Ok(Self {
            b,
            cl: confidence_level,
            ratio: RatioPolicy::Adaptive(choose_subsample_ratio),
            resampler,
            rescale,
            interval_type,
            exec: E::default(),
            chunk_hint: AtomicUsize::new(0),
            diag: None,
        })
    }
}
