//! Descriptive helpers shared by statistics and the engine diagnostics.

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with Bessel's correction; 0.0 below two observations.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation (sqrt of the Bessel-corrected variance).
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Skewness (third standardized moment, population formula).
///
/// Returns 0.0 for degenerate inputs (fewer than 3 values or zero spread).
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let n = values.len() as f64;
    let m = mean(values);
    let std = sample_std(values);
    if std < 1e-15 {
        return 0.0;
    }
    values.iter().map(|v| ((v - m) / std).powi(3)).sum::<f64>() / n
}
