//! Percentile-T (studentized double bootstrap).

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engines::{
    ensure_enough_replicates, reverse_tail_probs, validate_engine_params, BootstrapDiagnostics,
    EngineResult, IntervalType,
};
use crate::error::BootstrapError;
use quantci_core::{
    quantile_type7_unsorted, sample_std, EngineProvider, Executor, Resampler, SeedListProvider,
    SingleThreadExecutor, Statistic,
};
use rand::rngs::StdRng;

/// Smallest workable inner replication count.
pub const MIN_INNER: usize = 25;

/// Inner-loop early stop: past `MIN_INNER` draws, stop once the running
/// inner SE changes by less than this relative amount between checks.
const INNER_SE_STABILITY_TOL: f64 = 0.01;
const INNER_CHECK_STRIDE: usize = 8;

/// Double bootstrap with studentized pivots.
///
/// For each outer resample `y_b`, an inner loop of further resamples from
/// `y_b` estimates the standard error of the statistic, producing the pivot
/// `t*_b = (s(y_b) - θ̂) / se_inner(y_b)`. The interval reads quantiles of
/// the pivot distribution and scales them by the outer SE:
/// `[θ̂ - q_{1-α/2}(t*)·se_outer, θ̂ - q_{α/2}(t*)·se_outer]`. As with the
/// Basic engine the quantiles invert, so one-sided tail assignments use the
/// reverse mapping.
///
/// The inner loop may stop early once its SE estimate stabilizes; each
/// outer replicate owns its RNG engine, so early stopping never perturbs
/// other replicates' draws.
#[derive(Debug)]
pub struct PercentileTBootstrap<R, E = SingleThreadExecutor> {
    b_outer: usize,
    b_inner: usize,
    cl: f64,
    resampler: R,
    interval_type: IntervalType,
    exec: E,
    chunk_hint: AtomicUsize,
    diag: Option<BootstrapDiagnostics>,
}

impl<R, E: Executor> PercentileTBootstrap<R, E> {
    pub const NAME: &'static str = "PercentileTBootstrap";

    /// Fails with an invalid-argument error if `B_outer < 400`,
    /// `cl ∉ (0.5, 1)`, or `B_inner < 2`.
    pub fn new(
        b_outer: usize,
        b_inner: usize,
        confidence_level: f64,
        resampler: R,
        interval_type: IntervalType,
    ) -> Result<Self, BootstrapError> {
        validate_engine_params(Self::NAME, b_outer, confidence_level)?;
        if b_inner < 2 {
            return Err(BootstrapError::invalid(
                Self::NAME,
                format!("B_inner must be >= 2 (got {b_inner})"),
            ));
        }
        Ok(Self {
            b_outer,
            b_inner,
            cl: confidence_level,
            resampler,
            interval_type,
            exec: E::default(),
            chunk_hint: AtomicUsize::new(0),
            diag: None,
        })
    }

    /// Run with a deterministic engine provider (CRN-friendly).
    pub fn run<T, S, P>(
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

        let theta_hat = stat
            .apply(x)
            .map_err(|e| BootstrapError::from_statistic(Self::NAME, e))?;

        let chunk_hint = self.chunk_hint.load(Ordering::Relaxed);
        let b_inner = self.b_inner;
        let resampler = &self.resampler;

        // Each outer replicate yields (θ*_b, t*_b); NaN marks a skip.
        let raw: Vec<(f64, f64)> = self.exec.map_chunked(self.b_outer, chunk_hint, |rep| {
            let mut rng = provider.make_engine(rep as u64);

            let mut y: Vec<T> = Vec::with_capacity(n);
            if resampler.fill(x, &mut y, n, &mut rng).is_err() {
                return (f64::NAN, f64::NAN);
            }
            let theta_b = match stat.apply(&y) {
                Ok(v) if v.is_finite() => v,
                _ => return (f64::NAN, f64::NAN),
            };

            // Inner loop: estimate se of the statistic on y by resampling y.
            let mut inner_stats: Vec<f64> = Vec::with_capacity(b_inner);
            let mut z: Vec<T> = Vec::with_capacity(n);
            let mut prev_se = f64::NAN;
            for k in 0..b_inner {
                if resampler.fill(&y, &mut z, n, &mut rng).is_err() {
                    break;
                }
                if let Ok(v) = stat.apply(&z) {
                    if v.is_finite() {
                        inner_stats.push(v);
                    }
                }
                let drawn = k + 1;
                if drawn >= MIN_INNER && drawn % INNER_CHECK_STRIDE == 0 {
                    let se = sample_std(&inner_stats);
                    if prev_se.is_finite()
                        && se > 0.0
                        && ((se - prev_se) / prev_se).abs() < INNER_SE_STABILITY_TOL
                    {
                        break;
                    }
                    prev_se = se;
                }
            }

            if inner_stats.len() < 2 {
                return (f64::NAN, f64::NAN);
            }
            let se_inner = sample_std(&inner_stats);
            if se_inner <= 0.0 || !se_inner.is_finite() {
                return (f64::NAN, f64::NAN);
            }

            let pivot = (theta_b - theta_hat) / se_inner;
            if pivot.is_finite() {
                (theta_b, pivot)
            } else {
                (f64::NAN, f64::NAN)
            }
        });

        let mut thetas = Vec::with_capacity(raw.len());
        let mut pivots = Vec::with_capacity(raw.len());
        for (theta_b, pivot) in raw {
            if theta_b.is_finite() && pivot.is_finite() {
                thetas.push(theta_b);
                pivots.push(pivot);
            }
        }
        let skipped = self.b_outer - thetas.len();

        if let Err(e) = ensure_enough_replicates(Self::NAME, thetas.len(), self.b_outer) {
            self.diag = None;
            return Err(e);
        }

        let se_outer = sample_std(&thetas);

        let alpha = 1.0 - self.cl;
        let (pl, pu) = reverse_tail_probs(self.interval_type, alpha);
        let t_lo = quantile_type7_unsorted(&pivots, pl);
        let t_hi = quantile_type7_unsorted(&pivots, pu);

        let lower = theta_hat - t_hi * se_outer;
        let upper = theta_hat - t_lo * se_outer;

        let diag = BootstrapDiagnostics::from_replicates(thetas);
        let b_effective = diag.stats.len();
        self.diag = Some(diag);

        Ok(EngineResult {
            mean: theta_hat,
            lower,
            upper,
            cl: self.cl,
            b_requested: self.b_outer,
            b_effective,
            b_skipped: skipped,
            n,
            l: <R as Resampler<T>>::get_l(&self.resampler),
            se_boot: se_outer,
        })
    }

    /// Run with a caller-supplied RNG; sub-seeds are pre-drawn sequentially.
    pub fn run_with_rng<T, S>(
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
        let provider = SeedListProvider::draw(rng, self.b_outer);
        self.run(x, stat, &provider)
    }

    /// Hint for the parallel chunk size; `0` means implementation default.
    pub fn set_chunk_size_hint(&self, hint: usize) {
        self.chunk_hint.store(hint, Ordering::Relaxed);
    }

    pub fn b(&self) -> usize {
        self.b_outer
    }

    pub fn b_inner(&self) -> usize {
        self.b_inner
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

    /// The last run's outer bootstrap distribution.
    pub fn diagnostics(&self) -> Result<&BootstrapDiagnostics, BootstrapError> {
        self.diag
            .as_ref()
            .ok_or(BootstrapError::DiagnosticsUnavailable { engine: Self::NAME })
    }
}
