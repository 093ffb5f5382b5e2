//! `BoundFutureReturns` end-to-end: the synthetic 12-month scenario, policy
//! switching, and the one-sided vs two-sided lower-bound relationship.

use quantci_runner::{
    empirical_quantile, heuristic_block_length, BoundFutureReturns, BoundFutureReturnsParams,
    BoundPolicy, IntervalType,
};

/// The synthetic monthly series: paired ±2%, ±1.5%, ±1%.
fn synthetic_monthly() -> Vec<f64> {
    vec![
        0.02, 0.02, -0.02, -0.02, 0.015, 0.015, -0.015, -0.015, 0.01, 0.01, -0.01, -0.01,
    ]
}

fn params() -> BoundFutureReturnsParams {
    BoundFutureReturnsParams {
        num_bootstraps: 1000,
        ..Default::default()
    }
}

#[test]
fn heuristic_block_length_clamped() {
    let monthly = synthetic_monthly();
    let l = heuristic_block_length(&monthly);
    assert!((2..=6).contains(&l), "heuristic L = {l} outside [2, 6]");

    // Requesting the heuristic through the params surfaces the same value.
    let bounds = BoundFutureReturns::from_monthly_returns(
        monthly,
        BoundFutureReturnsParams {
            block_len: 0,
            ..params()
        },
    )
    .unwrap();
    assert_eq!(bounds.block_length_used(), l);
}

#[test]
fn ci_endpoints_straddle_point_quantiles() {
    let monthly = synthetic_monthly();
    let bounds = BoundFutureReturns::from_monthly_returns(monthly.clone(), params()).unwrap();

    let lower_ci = bounds.lower_quantile_ci();
    let upper_ci = bounds.upper_quantile_ci();

    assert!(lower_ci.lo <= lower_ci.point && lower_ci.point <= lower_ci.hi);
    assert!(upper_ci.lo <= upper_ci.point && upper_ci.point <= upper_ci.hi);

    // Conservative policy: operational bounds are the outer endpoints.
    assert_eq!(bounds.get_lower_bound(), lower_ci.lo);
    assert_eq!(bounds.get_upper_bound(), upper_ci.hi);
    assert!(bounds.get_lower_bound() <= bounds.get_upper_bound());
}

#[test]
fn point_policy_returns_exact_point_quantiles() {
    let monthly = synthetic_monthly();
    let mut bounds = BoundFutureReturns::from_monthly_returns(monthly.clone(), params()).unwrap();

    bounds.use_point_policy();
    assert_eq!(bounds.policy(), BoundPolicy::Point);
    assert_eq!(
        bounds.get_lower_bound(),
        empirical_quantile(&monthly, 0.10)
    );
    assert_eq!(
        bounds.get_upper_bound(),
        empirical_quantile(&monthly, 0.90)
    );

    bounds.use_conservative_policy();
    assert_eq!(bounds.policy(), BoundPolicy::Conservative);
    assert_eq!(bounds.get_lower_bound(), bounds.lower_quantile_ci().lo);
}

#[test]
fn bounds_are_deterministic_under_fixed_seed() {
    let a = BoundFutureReturns::from_monthly_returns(synthetic_monthly(), params()).unwrap();
    let b = BoundFutureReturns::from_monthly_returns(synthetic_monthly(), params()).unwrap();
    assert_eq!(a.get_lower_bound(), b.get_lower_bound());
    assert_eq!(a.get_upper_bound(), b.get_upper_bound());
}

#[test]
fn one_sided_lower_bound_at_least_two_sided() {
    // Concentrating alpha in one tail cannot lower the lower endpoint;
    // allow a small bootstrap tolerance.
    let monthly: Vec<f64> = (0..24)
        .map(|i| 0.002 + 0.02 * ((i as f64) * 0.9).sin())
        .collect();

    let two_sided = BoundFutureReturns::from_monthly_returns(monthly.clone(), params()).unwrap();
    let one_sided = BoundFutureReturns::from_monthly_returns(
        monthly,
        BoundFutureReturnsParams {
            interval_type: IntervalType::OneSidedLower,
            ..params()
        },
    )
    .unwrap();

    assert!(
        one_sided.get_lower_bound() >= two_sided.get_lower_bound() - 0.003,
        "one-sided lower {} fell below two-sided lower {}",
        one_sided.get_lower_bound(),
        two_sided.get_lower_bound()
    );
}

#[test]
fn monthly_series_is_preserved() {
    let monthly = synthetic_monthly();
    let bounds = BoundFutureReturns::from_monthly_returns(monthly.clone(), params()).unwrap();
    assert_eq!(bounds.monthly_returns(), monthly.as_slice());
    assert_eq!(bounds.params().num_bootstraps, 1000);
}
