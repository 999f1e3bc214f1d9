//! Invariants of the hazard, damage and impact computations, swept over fixed grids

use approx::assert_relative_eq;
use chrono::NaiveDate;
use flood_risk_core::damage::LandUse;
use flood_risk_core::hazard::{calculate_return_levels, GevDistribution};
use flood_risk_core::risk::linear_impact_curve;
use flood_risk_core::{
    ClimateScenario, DamageFunction, FloodRiskEngine, FloodRiskError, HazardStrategy, Meters,
    ReturnPeriod, TimeSeries,
};

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Evenly spaced Gumbel(μ=100, σ=20) quantiles.
fn gumbel_sample(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let p = (i as f64 + 0.5) / n as f64;
            100.0 - 20.0 * (-p.ln()).ln()
        })
        .collect()
}

#[test]
fn test_return_level_probabilities_exact_and_decreasing() {
    let dist = GevDistribution::new(0.1, 100.0, 20.0).unwrap();
    let periods = ReturnPeriod::from_years(&[2, 5, 10, 25, 50, 100, 250, 500, 1000]).unwrap();
    let table = calculate_return_levels(&dist, &periods, 0.2).unwrap();

    for row in table.rows() {
        assert_eq!(row.annual_probability, 1.0 / f64::from(row.return_period.years()));
    }
    for pair in table.rows().windows(2) {
        assert!(pair[1].annual_probability < pair[0].annual_probability);
        assert!(pair[1].magnitude >= pair[0].magnitude);
    }
}

#[test]
fn test_window_probability_monotone_in_window() {
    let engine = FloodRiskEngine::default();
    for events in [1_u64, 10, 100, 1000, 3649] {
        let mut previous = 0.0;
        for window in [1_u32, 7, 30, 90, 180, 365, 3650] {
            let p = engine.event_probability(events, 3650, window);
            assert!((0.0..=1.0).contains(&p), "out of range: {p}");
            assert!(p >= previous, "window {window} decreased probability");
            previous = p;
        }
    }
    assert_eq!(engine.event_probability(5, 0, 30), 0.0);
}

#[test]
fn test_return_period_window_probability() {
    let engine = FloodRiskEngine::default();
    let rp = ReturnPeriod::new(100).unwrap();
    let one_year = engine.return_period_probability(rp, 365.25);
    assert_relative_eq!(one_year, 0.01, max_relative = 1e-12);
    assert!(engine.return_period_probability(rp, 3652.5) > one_year);
}

#[test]
fn test_interpolation_monotone_with_exact_boundaries() {
    let functions = [
        DamageFunction::from_pairs(&[(0.0, 0.0), (0.5, 0.2), (1.0, 0.4), (3.0, 0.9), (6.0, 1.0)])
            .unwrap(),
        DamageFunction::from_pairs(&[(0.5, 0.1), (2.0, 0.6)]).unwrap(),
        DamageFunction::sigmoid(LandUse::Commercial),
    ];
    for function in &functions {
        let points = function.points();
        let first = points[0];
        let last = points[points.len() - 1];

        let mut previous = function.ratio(Meters::ZERO);
        for step in 0..=200 {
            let ratio = function.ratio(Meters::new(f64::from(step) * 0.05));
            assert!((0.0..=1.0).contains(&ratio));
            assert!(ratio >= previous);
            previous = ratio;
        }
        assert_eq!(function.ratio(Meters::new(first.depth_m)), first.damage_ratio);
        assert_eq!(function.ratio(Meters::ZERO), first.damage_ratio);
        assert_eq!(function.ratio(Meters::new(last.depth_m)), last.damage_ratio);
        assert_eq!(function.ratio(Meters::new(50.0)), last.damage_ratio);
    }
}

#[test]
fn test_fit_sample_count_threshold() {
    let engine = FloodRiskEngine::default();
    let err = engine.fit(&gumbel_sample(9)).unwrap_err();
    assert!(matches!(
        err,
        FloodRiskError::InsufficientData { required: 10, actual: 9, .. }
    ));

    for n in [10, 20, 50] {
        let params = engine.fit(&gumbel_sample(n)).unwrap();
        assert!(params.scale() > 0.0);
        assert_eq!(params.sample_count, n);
    }
}

#[test]
fn test_fit_and_derive_from_daily_series() {
    let engine = FloodRiskEngine::default();
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    // one peak per year on an otherwise dry series
    let mut values = vec![0.0; 365 * 15];
    for (year, peak) in gumbel_sample(15).into_iter().enumerate() {
        values[year * 365 + 180] = peak;
    }
    let series = TimeSeries::daily(start, &values).unwrap();
    let periods = ReturnPeriod::from_years(&[10, 100]).unwrap();
    let fitted = engine.fit_and_derive_return_levels(&series, &periods).unwrap();

    assert!(fitted.parameters.scale() > 0.0);
    let rows = fitted.return_levels.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].magnitude > rows[0].magnitude);
    for row in rows {
        assert_relative_eq!(row.confidence_lower, row.magnitude * 0.8, max_relative = 1e-12);
        assert_relative_eq!(row.confidence_upper, row.magnitude * 1.2, max_relative = 1e-12);
    }
}

#[test]
fn test_eai_additive_over_rows() {
    let engine = FloodRiskEngine::default();
    let periods = ReturnPeriod::from_years(&[10, 50, 100]).unwrap();
    let curve = engine
        .build_hazard_curve(
            "Pahang",
            ClimateScenario::Moderate,
            Some(&periods),
            HazardStrategy::Simulated,
        )
        .unwrap();
    let exposure = 5e9;
    let damage = linear_impact_curve();
    let result = engine.calculate_eai("Pahang", &curve, exposure, &damage).unwrap();

    assert_eq!(result.breakdown.len(), 3);
    let manual: f64 = curve
        .rows()
        .iter()
        .map(|row| row.annual_probability * exposure * damage.ratio(row.intensity))
        .sum();
    assert_relative_eq!(result.expected_annual_impact, manual, max_relative = 1e-12);
}

#[test]
fn test_historical_rescaled_to_high_emissions() {
    let engine = FloodRiskEngine::default();
    for location in ["Kelantan", "Selangor", "Malaysia (Country)", "Unlisted"] {
        let historical = engine
            .build_hazard_curve(location, ClimateScenario::Historical, None, HazardStrategy::Simulated)
            .unwrap();
        let high = engine.rescale_hazard_curve(&historical, ClimateScenario::HighEmissions);
        assert_eq!(high.scenario, ClimateScenario::HighEmissions);
        for (h, base) in high.rows().iter().zip(historical.rows()) {
            assert_eq!(h.intensity, base.intensity * 1.5);
            assert_eq!(h.annual_probability, base.annual_probability);
        }
    }
}

#[test]
fn test_scenario_comparison_ordering() {
    let engine = FloodRiskEngine::default();
    let rows = engine
        .compare_scenarios("Terengganu", ReturnPeriod::new(100).unwrap())
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].change_pct, 0.0);
    for pair in rows.windows(2) {
        assert!(pair[1].intensity >= pair[0].intensity);
    }
}
