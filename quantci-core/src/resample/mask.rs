//! Bernoulli restart mask for stationary block resampling.

use crate::error::ResampleError;
use rand::rngs::StdRng;
use rand::Rng;

/// Build a 0/1 restart mask of length `m` for mean block length `l`.
///
/// The mask encodes where a new block begins in a stationary-bootstrap
/// sequence: `mask[0] == 1` always, and for `t >= 1` a restart occurs with
/// probability `p = 1/l` (clamped to 1 when `l <= 1`). When `1/l` underflows
/// to numerically zero while `l > 1`, the whole output is a single block —
/// no restarts after `t = 0`.
///
/// The empirical mean block length of sequences generated from this mask
/// approaches `l`, and the first-block length approaches a geometric
/// distribution with mean `l`.
///
/// Fails with an invalid-argument error if `m < 2`, or `l < 1`, or `l` is
/// not finite.
pub fn make_restart_mask(m: usize, l: f64, rng: &mut StdRng) -> Result<Vec<u8>, ResampleError> {
    if m < 2 {
        return Err(ResampleError::invalid(
            "make_restart_mask",
            format!("m must be >= 2 (got {m})"),
        ));
    }
    if !l.is_finite() || l < 1.0 {
        return Err(ResampleError::invalid(
            "make_restart_mask",
            format!("L must be finite and >= 1 (got {l})"),
        ));
    }

    let p = if l <= 1.0 { 1.0 } else { 1.0 / l };

    // Guard against p underflowing to ~0 for astronomically large L: emit a
    // single block instead of feeding a denormal probability to the sampler.
    let min_p = f64::EPSILON * 10.0;
    let effectively_infinite_l = p < min_p && l > 1.0;

    let mut mask = vec![0u8; m];
    mask[0] = 1;

    if !effectively_infinite_l {
        for slot in mask.iter_mut().skip(1) {
            if rng.gen::<f64>() < p {
                *slot = 1;
            }
        }
    }

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn first_element_always_restarts() {
        let mut rng = StdRng::seed_from_u64(1);
        for l in [1.0, 2.0, 5.0, 50.0] {
            let mask = make_restart_mask(64, l, &mut rng).unwrap();
            assert_eq!(mask[0], 1);
        }
    }

    #[test]
    fn l_of_one_restarts_everywhere() {
        let mut rng = StdRng::seed_from_u64(2);
        let mask = make_restart_mask(32, 1.0, &mut rng).unwrap();
        assert!(mask.iter().all(|&b| b == 1));
    }

    #[test]
    fn restart_rate_approaches_one_over_l() {
        // Mean restart count over many masks should approach m/L.
        let mut rng = StdRng::seed_from_u64(3);
        let (m, l, reps) = (200usize, 5.0f64, 2000usize);
        let mut total = 0usize;
        for _ in 0..reps {
            let mask = make_restart_mask(m, l, &mut rng).unwrap();
            total += mask.iter().filter(|&&b| b == 1).count();
        }
        let mean_restarts = total as f64 / reps as f64;
        let expected = 1.0 + (m as f64 - 1.0) / l;
        assert!(
            (mean_restarts - expected).abs() < 0.05 * expected,
            "mean restarts {mean_restarts} vs expected {expected}"
        );
    }

    #[test]
    fn first_block_length_is_geometric_with_mean_l() {
        let mut rng = StdRng::seed_from_u64(4);
        let (m, l, reps) = (400usize, 8.0f64, 4000usize);
        let mut total_len = 0usize;
        for _ in 0..reps {
            let mask = make_restart_mask(m, l, &mut rng).unwrap();
            let first_len = mask[1..]
                .iter()
                .position(|&b| b == 1)
                .map(|p| p + 1)
                .unwrap_or(m);
            total_len += first_len;
        }
        let mean_first = total_len as f64 / reps as f64;
        assert!(
            (mean_first - l).abs() < 0.1 * l,
            "mean first-block length {mean_first} vs L {l}"
        );
    }

    #[test]
    fn huge_l_produces_single_block() {
        let mut rng = StdRng::seed_from_u64(5);
        let mask = make_restart_mask(64, 1e300, &mut rng).unwrap();
        assert_eq!(mask[0], 1);
        assert!(mask[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_short_output_and_bad_l() {
        let mut rng = StdRng::seed_from_u64(6);
        assert!(make_restart_mask(1, 3.0, &mut rng).is_err());
        assert!(make_restart_mask(10, 0.5, &mut rng).is_err());
        assert!(make_restart_mask(10, f64::NAN, &mut rng).is_err());
        assert!(make_restart_mask(10, f64::INFINITY, &mut rng).is_err());
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let a = make_restart_mask(128, 4.0, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = make_restart_mask(128, 4.0, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }
}
