//! Factory pairing each bootstrap engine with its deterministic RNG
//! provider.
//!
//! All engines built for one tournament share the same provider coordinates
//! `(master_seed, stage_tag, block_size, fold, strategy_hash)`, so they see
//! identical replicate streams — which makes their intervals comparable
//! draws of the same resampling randomness. With common random numbers
//! enabled, the strategy hash is dropped from derivation and distinct
//! strategies share streams too.

use crate::engines::{
    BasicBootstrap, BcaBootstrap, IntervalType, MOutOfNPercentileBootstrap, NormalBootstrap,
    PercentileBootstrap, PercentileTBootstrap,
};
use crate::error::BootstrapError;
use quantci_core::{CrnProvider, Executor};

/// Coordinates identifying one engine build within a validation run.
#[derive(Debug, Clone, Copy)]
pub struct SeedCoordinates {
    pub strategy_hash: u64,
    pub stage_tag: u64,
    pub block_size: u64,
    pub fold: u64,
}

/// Builds bootstrap engines together with their CRN providers.
#[derive(Debug, Clone, Copy)]
pub struct TradingBootstrapFactory {
    master_seed: u64,
    common_random_numbers: bool,
}

impl TradingBootstrapFactory {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            common_random_numbers: false,
        }
    }

    /// Share replicate streams across strategies (drops the strategy hash
    /// from seed derivation).
    pub fn with_common_random_numbers(mut self, on: bool) -> Self {
        self.common_random_numbers = on;
        self
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn provider(&self, coords: SeedCoordinates) -> CrnProvider {
        if self.common_random_numbers {
            CrnProvider::common(
                self.master_seed,
                coords.stage_tag,
                coords.block_size,
                coords.fold,
            )
        } else {
            CrnProvider::new(
                self.master_seed,
                coords.stage_tag,
                coords.block_size,
                coords.fold,
                coords.strategy_hash,
            )
        }
    }

    pub fn make_normal<R, E: Executor>(
        &self,
        b: usize,
        cl: f64,
        resampler: R,
        coords: SeedCoordinates,
        interval_type: IntervalType,
    ) -> Result<(NormalBootstrap<R, E>, CrnProvider), BootstrapError> {
        Ok((
            NormalBootstrap::new(b, cl, resampler, interval_type)?,
            self.provider(coords),
        ))
    }

    pub fn make_basic<R, E: Executor>(
        &self,
        b: usize,
        cl: f64,
        resampler: R,
        coords: SeedCoordinates,
        interval_type: IntervalType,
    ) -> Result<(BasicBootstrap<R, E>, CrnProvider), BootstrapError> {
        Ok((
            BasicBootstrap::new(b, cl, resampler, interval_type)?,
            self.provider(coords),
        ))
    }

    pub fn make_percentile<R, E: Executor>(
        &self,
        b: usize,
        cl: f64,
        resampler: R,
        coords: SeedCoordinates,
        interval_type: IntervalType,
    ) -> Result<(PercentileBootstrap<R, E>, CrnProvider), BootstrapError> {
        Ok((
            PercentileBootstrap::new(b, cl, resampler, interval_type)?,
            self.provider(coords),
        ))
    }

    /// Fixed-ratio M-out-of-N for any sample type.
    pub fn make_m_out_of_n<T, R, E: Executor>(
        &self,
        b: usize,
        cl: f64,
        ratio: f64,
        resampler: R,
        coords: SeedCoordinates,
        rescale: bool,
        interval_type: IntervalType,
    ) -> Result<(MOutOfNPercentileBootstrap<T, R, E>, CrnProvider), BootstrapError> {
        Ok((
            MOutOfNPercentileBootstrap::new(b, cl, ratio, resampler, rescale, interval_type)?,
            self.provider(coords),
        ))
    }

    /// Adaptive-ratio M-out-of-N; bar-level samples only.
    pub fn make_adaptive_m_out_of_n<R, E: Executor>(
        &self,
        b: usize,
        cl: f64,
        resampler: R,
        coords: SeedCoordinates,
        rescale: bool,
        interval_type: IntervalType,
    ) -> Result<(MOutOfNPercentileBootstrap<f64, R, E>, CrnProvider), BootstrapError> {
        Ok((
            MOutOfNPercentileBootstrap::adaptive(b, cl, resampler, rescale, interval_type)?,
            self.provider(coords),
        ))
    }

    pub fn make_percentile_t<R, E: Executor>(
        &self,
        b_outer: usize,
        b_inner: usize,
        cl: f64,
        resampler: R,
        coords: SeedCoordinates,
        interval_type: IntervalType,
    ) -> Result<(PercentileTBootstrap<R, E>, CrnProvider), BootstrapError> {
        Ok((
            PercentileTBootstrap::new(b_outer, b_inner, cl, resampler, interval_type)?,
            self.provider(coords),
        ))
    }

    pub fn make_bca<R, E: Executor>(
        &self,
        b: usize,
        cl: f64,
        resampler: R,
        coords: SeedCoordinates,
        interval_type: IntervalType,
    ) -> Result<(BcaBootstrap<R, E>, CrnProvider), BootstrapError> {
        Ok((
            BcaBootstrap::new(b, cl, resampler, interval_type)?,
            self.provider(coords),
        ))
    }
}
