//! Basic (reverse percentile) bootstrap.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engines::{
    collect_replicates, ensure_enough_replicates, reverse_tail_probs, validate_engine_params,
    BootstrapDiagnostics, EngineResult, IntervalType,
};
use crate::error::BootstrapError;
use quantci_core::{
    quantile_type7_unsorted, EngineProvider, Executor, Resampler, SeedListProvider,
    SingleThreadExecutor, Statistic,
};
use rand::rngs::StdRng;

/// Reverse-percentile bootstrap: endpoints `2θ̂ - q_{pu}` and `2θ̂ - q_{pl}`.
///
/// Because the formula inverts the replicate quantiles, the one-sided tail
/// assignment is the mirror of the Percentile engine's: the finite lower
/// bound is driven by the *upper* replicate quantile (`pu = 1 - α`) and vice
/// versa. See [`reverse_tail_probs`].
///
/// `run` takes `&mut self`: concurrent runs on a single instance are ruled
/// out by the exclusive borrow; separate instances run freely in parallel.
#[derive(Debug)]
pub struct BasicBootstrap<R, E = SingleThreadExecutor> {
    b: usize,
    cl: f64,
    resampler: R,
    interval_type: IntervalType,
    exec: E,
    chunk_hint: AtomicUsize,
    diag: Option<BootstrapDiagnostics>,
}

impl<R, E: Executor> BasicBootstrap<R, E> {
    pub const NAME: &'static str = "BasicBootstrap";

    /// Fails with an invalid-argument error if `B < 400` or `cl ∉ (0.5, 1)`.
    pub fn new(
        b: usize,
        confidence_level: f64,
        resampler: R,
        interval_type: IntervalType,
    ) -> Result<Self, BootstrapError> {
        validate_engine_params(Self::NAME, b, confidence_level)?;
        Ok(Self {
            b,
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
        let (thetas, skipped) = collect_replicates(
            x,
            n,
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
        let (pl, pu) = reverse_tail_probs(self.interval_type, alpha);
        let q_lo = quantile_type7_unsorted(&thetas, pl);
        let q_hi = quantile_type7_unsorted(&thetas, pu);

        let lower = 2.0 * theta_hat - q_hi;
        let upper = 2.0 * theta_hat - q_lo;

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
        let provider = SeedListProvider::draw(rng, self.b);
        self.run(x, stat, &provider)
    }

    /// Hint for the parallel chunk size; `0` means implementation default.
    /// Safe to call concurrently with other accessors.
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
