//! Normal (Wald) bootstrap using the bootstrap standard error.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::engines::{
    collect_replicates, ensure_enough_replicates, phi_inv, validate_engine_params,
    BootstrapDiagnostics, EngineResult, IntervalType,
};
use crate::error::BootstrapError;
use quantci_core::{
    EngineProvider, Executor, Resampler, SeedListProvider, SingleThreadExecutor, Statistic,
};
use rand::rngs::StdRng;

/// How many bootstrap standard errors the unused side of a one-sided
/// interval extends from the center.
const UNBOUNDED_SE_MULTIPLE: f64 = 1e6;

/// Wald interval around θ̂ using the bootstrap SE:
/// `θ̂ ± z_{1-α/2} · se_boot` (two-sided). One-sided intervals use
/// `z_{1-α}` for the bounded side and push the other side
/// `1e6 · se_boot` away from the center.
///
/// Like [`crate::engines::PercentileBootstrap`], `run` takes `&self` with
/// internally synchronized state; concurrent runs on one instance are safe.
#[derive(Debug)]
pub struct NormalBootstrap<R, E = SingleThreadExecutor> {
    b: usize,
    cl: f64,
    resampler: R,
    interval_type: IntervalType,
    exec: E,
    chunk_hint: AtomicUsize,
    diag: Mutex<Option<BootstrapDiagnostics>>,
}

impl<R, E: Executor> NormalBootstrap<R, E> {
    pub const NAME: &'static str = "NormalBootstrap";

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

        let diag = BootstrapDiagnostics::from_replicates(thetas);
        let se_boot = diag.se_boot;
        let b_effective = diag.stats.len();

        let alpha = 1.0 - self.cl;
        let (lower, upper) = match self.interval_type {
            IntervalType::TwoSided => {
                let z = phi_inv(1.0 - alpha / 2.0);
                (theta_hat - z * se_boot, theta_hat + z * se_boot)
            }
            IntervalType::OneSidedLower => {
                let z = phi_inv(1.0 - alpha);
                (
                    theta_hat - z * se_boot,
                    theta_hat + UNBOUNDED_SE_MULTIPLE * se_boot,
                )
            }
            IntervalType::OneSidedUpper => {
                let z = phi_inv(1.0 - alpha);
                (
                    theta_hat - UNBOUNDED_SE_MULTIPLE * se_boot,
                    theta_hat + z * se_boot,
                )
            }
        };

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

    /// Run with a caller-supplied RNG; sub-seeds are pre-drawn sequentially.
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

    pub fn has_diagnostics(&self) -> bool {
        self.diag.lock().expect("diagnostics mutex poisoned").is_some()
    }

    /// Atomic snapshot of the last run's bootstrap distribution. Callers
    /// that need consistency across fields must use this rather than the
    /// individual getters below.
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

#[cfg(test)]
mod tests {
    use super::*;
    use quantci_core::{CrnProvider, IidResampler, MeanStat, StationaryMaskValueResampler};

    fn provider() -> CrnProvider {
        CrnProvider::new(42, 7, 3, 0, 0x5ca1e)
    }

    fn engine(
        cl: f64,
        it: IntervalType,
    ) -> NormalBootstrap<StationaryMaskValueResampler, SingleThreadExecutor> {
        NormalBootstrap::new(500, cl, StationaryMaskValueResampler::new(3).unwrap(), it).unwrap()
    }

    #[test]
    fn interval_on_integer_ramp() {
        // x = 0..19: sample mean 9.5; the CI must cover it symmetrically.
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let res = engine(0.95, IntervalType::TwoSided)
            .run(&x, &MeanStat, &provider())
            .unwrap();

        assert!(res.mean >= 9.0 && res.mean <= 10.5);
        assert!(res.lower <= res.mean && res.mean <= res.upper);

        // Centered: half-widths match to rounding.
        assert!(((res.mean - res.lower) - (res.upper - res.mean)).abs() < 1e-9);

        let wide = engine(0.99, IntervalType::TwoSided)
            .run(&x, &MeanStat, &provider())
            .unwrap();
        let narrow = engine(0.90, IntervalType::TwoSided)
            .run(&x, &MeanStat, &provider())
            .unwrap();
        assert!(wide.upper - wide.lower > res.upper - res.lower);
        assert!(narrow.upper - narrow.lower < res.upper - res.lower);
    }

    #[test]
    fn one_sided_half_width_ratio() {
        // z(0.95)/z(0.975) ≈ 0.839: the one-sided bounded half-width is
        // about 0.84 of the two-sided one at cl = 0.95.
        let x: Vec<f64> = (0..40).map(|i| 0.01 * ((i as f64) * 1.3).sin()).collect();
        let two = engine(0.95, IntervalType::TwoSided)
            .run(&x, &MeanStat, &provider())
            .unwrap();
        let one = engine(0.95, IntervalType::OneSidedLower)
            .run(&x, &MeanStat, &provider())
            .unwrap();

        let ratio = (one.mean - one.lower) / (two.mean - two.lower);
        assert!(
            (0.80..=0.88).contains(&ratio),
            "one-sided/two-sided half-width ratio {ratio} out of range"
        );

        // The unused side is effectively unbounded.
        assert!(one.upper - one.mean > 1e5 * two.se_boot);
    }

    #[test]
    fn half_width_equals_z_times_se() {
        let x: Vec<f64> = (0..30).map(|i| (i as f64 * 0.61).cos() * 0.02).collect();
        let res = engine(0.95, IntervalType::TwoSided)
            .run(&x, &MeanStat, &provider())
            .unwrap();
        let z = phi_inv(0.975);
        assert!(((res.upper - res.mean) - z * res.se_boot).abs() < 1e-12);
    }

    #[test]
    fn diagnostics_snapshot_is_consistent() {
        let x: Vec<f64> = (0..25).map(|i| (i as f64 * 0.17).sin() * 0.05).collect();
        let e = engine(0.95, IntervalType::TwoSided);
        let res = e.run(&x, &MeanStat, &provider()).unwrap();
        let d = e.diagnostics().unwrap();
        assert_eq!(d.stats.len(), res.b_effective);
        assert!((d.se_boot - res.se_boot).abs() < 1e-15);
        assert!((d.var_boot - d.se_boot * d.se_boot).abs() < 1e-12);
    }

    #[test]
    fn constant_series_yields_zero_width() {
        let x = vec![0.01; 20];
        let res = NormalBootstrap::<IidResampler>::new(
            400,
            0.95,
            IidResampler,
            IntervalType::TwoSided,
        )
        .unwrap()
        .run(&x, &MeanStat, &provider())
        .unwrap();
        assert_eq!(res.se_boot, 0.0);
        assert!((res.upper - res.lower).abs() < 1e-15);
    }
}
