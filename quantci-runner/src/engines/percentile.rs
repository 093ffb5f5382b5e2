//! Standard n-out-of-n percentile bootstrap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::engines::{
    collect_replicates, direct_tail_probs, ensure_enough_replicates, validate_engine_params,
    BootstrapDiagnostics, EngineResult, IntervalType,
};
use crate::error::BootstrapError;
use quantci_core::{
    quantile_type7_unsorted, EngineProvider, Executor, Resampler, SeedListProvider,
    SingleThreadExecutor, Statistic,
};
use rand::rngs::StdRng;

/// Classical nonparametric percentile bootstrap.
///
/// Draws `B` length-`n` resamples, computes the statistic on each, and forms
/// the interval from type-7 empirical quantiles of the replicate
/// distribution at the tail probabilities implied by the interval type.
///
/// `run` takes `&self` and all mutable state (diagnostics, chunk hint) is
/// internally synchronized, so concurrent runs on one instance are safe; a
/// caller-supplied RNG is consumed up front rather than shared across
/// replicates.
#[derive(Debug)]
pub struct PercentileBootstrap<R, E = SingleThreadExecutor> {
    b: usize,
    cl: f64,
    resampler: R,
    interval_type: IntervalType,
    exec: E,
    chunk_hint: AtomicUsize,
    diag: Mutex<Option<BootstrapDiagnostics>>,
}

impl<R, E: Executor> PercentileBootstrap<R, E> {
    pub const NAME: &'static str = "PercentileBootstrap";

    /// Fails with an invalid-argument error if `B < 400` or
    /// `cl ∉ (0.5, 1)`.
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
            diag: Mutex::new(None),
        })
    }

    /// Run with a deterministic engine provider (CRN-friendly).
    pub fn run<T, S, P>(&self, x: &[T], stat: &S, provider: &P) -> Result<EngineResult, BootstrapError>
    where
        T: Clone + Sync,
        S: Statistic<T> + Sync,
        R: Resampler<T> + Sync,
        P: EngineProvider + Sync,
    {
        let n = x.len();
        if n < 3 {
            self.invalidate_diagnostics();
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
            self.invalidate_diagnostics();
            return Err(e);
        }

        let alpha = 1.0 - self.cl;
        let (pl, pu) = direct_tail_probs(self.interval_type, alpha);
        let lower = quantile_type7_unsorted(&thetas, pl);
        let upper = quantile_type7_unsorted(&thetas, pu);

        let diag = BootstrapDiagnostics::from_replicates(thetas);
        let se_boot = diag.se_boot;
        let b_effective = diag.stats.len();
        *self.diag.lock().expect("diagnostics mutex poisoned") = Some(diag);

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

    /// Run with a caller-supplied RNG.
    ///
    /// All `B` sub-seeds are drawn from `rng` sequentially before the
    /// parallel region, so seed-to-replicate assignment does not depend on
    /// scheduling.
    pub fn run_with_rng<T, S>(
        &self,
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

    pub fn interval_type(&self) -> IntervalType {
        self.interval_type
    }

    pub fn has_diagnostics(&self) -> bool {
        self.diag.lock().expect("diagnostics mutex poisoned").is_some()
    }

    /// Atomic snapshot of the last run's bootstrap distribution.
    ///
    /// All four fields come from one lock acquisition, so they always
    /// describe the same run. Callers that need consistency *across*
    /// fields must use this rather than the individual getters below.
    pub fn diagnostics(&self) -> Result<BootstrapDiagnostics, BootstrapError> {
        self.diag
            .lock()
            .expect("diagnostics mutex poisoned")
            .clone()
            .ok_or(BootstrapError::DiagnosticsUnavailable { engine: Self::NAME })
    }

    /// Usable replicate statistics from the last run.
    pub fn bootstrap_statistics(&self) -> Result<Vec<f64>, BootstrapError> {
        Ok(self.diagnostics()?.stats)
    }

    /// Mean of the bootstrap distribution from the last run.
    pub fn bootstrap_mean(&self) -> Result<f64, BootstrapError> {
        Ok(self.diagnostics()?.mean_boot)
    }

    /// Variance of the bootstrap distribution from the last run.
    pub fn bootstrap_variance(&self) -> Result<f64, BootstrapError> {
        Ok(self.diagnostics()?.var_boot)
    }

    /// Standard error of the bootstrap distribution from the last run.
    pub fn bootstrap_se(&self) -> Result<f64, BootstrapError> {
        Ok(self.diagnostics()?.se_boot)
    }

    fn invalidate_diagnostics(&self) {
        *self.diag.lock().expect("diagnostics mutex poisoned") = None;
    }
}
