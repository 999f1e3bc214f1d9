//! End-to-end checks of the engine facade on hand-computed scenarios

use approx::assert_relative_eq;
use flood_risk_core::damage::{
    CountrySource, DamageCurve, DamageFunctionRow, FunctionScope, FunctionTier,
};
use flood_risk_core::hazard::HazardCurve;
use flood_risk_core::risk::linear_impact_curve;
use flood_risk_core::{
    BuildingType, DamageFunction, DamageRequest, EaiRequest, EngineConfig, ErrorKind,
    FloodRiskEngine, FloodRiskError, HazardStrategy, Meters, ReferenceData, ReferenceTables,
    Region, ReturnPeriod,
};

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_high_rate_event_window_probability() {
    let engine = FloodRiskEngine::default();
    // 150 flood days over ten years, one-year window
    let p = engine.event_probability(150, 3650, 365);
    let expected = 1.0 - (1.0 - 150.0_f64 / 3650.0).powi(365);
    assert_relative_eq!(p, expected, max_relative = 1e-12);
    assert!(p > 0.9999 && p < 1.0, "near-certain but not certain: {p}");
}

#[test]
fn test_midpoint_depth_interpolation() {
    let function = DamageFunction::from_pairs(&[(0.0, 0.0), (1.0, 0.5), (2.0, 1.0)]).unwrap();
    assert_relative_eq!(function.ratio(Meters::new(1.5)), 0.75, epsilon = 1e-12);
}

#[test]
fn test_single_row_expected_annual_impact() {
    let engine = FloodRiskEngine::default();
    let curve =
        HazardCurve::from_rows("site", [(ReturnPeriod::new(100).unwrap(), Meters::new(0.9))])
            .unwrap();
    let result = engine
        .calculate_eai("site", &curve, 1_000_000_000.0, &linear_impact_curve())
        .unwrap();

    let row = &result.breakdown[0];
    assert_eq!(row.annual_probability, 0.01);
    assert_relative_eq!(row.damage_ratio, 0.3, epsilon = 1e-12);
    assert_relative_eq!(result.expected_annual_impact, 3_000_000.0, max_relative = 1e-12);
    assert_relative_eq!(result.eai_ratio, 0.003, max_relative = 1e-12);
}

#[test]
fn test_unknown_country_degrades_to_default_economics() {
    let engine = FloodRiskEngine::default();
    let request = DamageRequest::new(10.0, 10.0, 1.0).with_country("ZZ");
    let result = engine.calculate_damage(&request).unwrap();

    assert!(result.provenance.economics_fallback);
    assert!(result.provenance.used_fallback());
    assert_eq!(result.provenance.country_source, CountrySource::Supplied);
    assert_eq!(result.currency, "USD");
    assert!(result.economic_damage > 0.0);
}

#[test]
fn test_resolved_country_drives_currency() {
    let engine = FloodRiskEngine::default();
    // Houston, no country given
    let result = engine
        .calculate_damage(&DamageRequest::new(29.76, -95.37, 1.0))
        .unwrap();
    assert_eq!(result.country_code, "US");
    assert_eq!(result.provenance.country_source, CountrySource::Resolved);
    assert!(!result.provenance.economics_fallback);
    assert_eq!(result.building_type, BuildingType::Residential);
    assert_relative_eq!(result.total_value, result.value_per_m2 * result.area_m2, max_relative = 1e-12);
    assert_relative_eq!(
        result.economic_damage,
        result.total_value * result.damage_ratio,
        max_relative = 1e-12
    );
}

#[test]
fn test_invalid_inputs_surface_field() {
    let engine = FloodRiskEngine::default();
    let cases = [
        (DamageRequest::new(95.0, 0.0, 1.0), "latitude"),
        (DamageRequest::new(0.0, 181.0, 1.0), "longitude"),
        (DamageRequest::new(0.0, 0.0, -0.5), "flood_depth"),
        (DamageRequest::new(0.0, 0.0, 25.0), "flood_depth"),
    ];
    for (request, field) in cases {
        match engine.calculate_damage(&request) {
            Err(FloodRiskError::Validation { field: got, .. }) => assert_eq!(got, field),
            other => panic!("expected validation error on {field}, got {other:?}"),
        }
    }
}

#[test]
fn test_damage_batch_isolates_failures() {
    let engine = FloodRiskEngine::default();
    let requests = vec![
        DamageRequest::new(29.76, -95.37, 1.0),
        DamageRequest::new(200.0, 0.0, 1.0),
        DamageRequest::new(3.139, 101.69, 2.0).with_building_type(BuildingType::Commercial),
    ];
    let items = engine.calculate_damage_batch(&requests);

    assert_eq!(items.len(), 3);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.index, i);
    }
    assert!(items[0].is_ok());
    assert_eq!(items[1].error().map(FloodRiskError::kind), Some(ErrorKind::Validation));
    assert_eq!(items[2].value().map(|r| r.country_code.as_str()), Some("MY"));

    let summary = engine.summarize_damage(&items);
    assert_eq!(summary.total_calculations, 3);
    assert_eq!(summary.valid_calculations, 2);
    assert_eq!(summary.failed_calculations, 1);
    let damages = summary.economic_damage.unwrap();
    assert_relative_eq!(
        damages.total,
        items[0].value().unwrap().economic_damage + items[2].value().unwrap().economic_damage,
        max_relative = 1e-12
    );
}

#[test]
fn test_eai_batch_isolates_failures() {
    let engine = FloodRiskEngine::default();
    let mut good = EaiRequest::new("Kelantan");
    good.exposure = Some(1e9);
    let mut zero = EaiRequest::new("Johor");
    zero.exposure = Some(0.0);
    let mut unknown = EaiRequest::new("Atlantis");
    unknown.country_code = Some("ATL".into());

    let items = engine.calculate_eai_batch(&[good, zero, unknown]);
    assert!(items[0].is_ok());
    assert_eq!(items[1].error().map(FloodRiskError::kind), Some(ErrorKind::ZeroExposure));
    assert_eq!(items[2].error().map(FloodRiskError::kind), Some(ErrorKind::DataNotFound));
}

#[test]
fn test_building_type_eai_uses_damage_function() {
    let engine = FloodRiskEngine::default();
    let mut request = EaiRequest::new("Selangor");
    request.exposure = Some(1e9);
    request.building_type = Some(BuildingType::Industrial);
    request.include_uncertainty = true;
    let result = engine.calculate_location_eai(&request).unwrap();

    let curve = engine
        .build_hazard_curve(
            "Selangor",
            request.scenario,
            None,
            HazardStrategy::Simulated,
        )
        .unwrap();
    let resolved = engine.reference().damage_functions.resolve(
        BuildingType::Industrial,
        None,
        None,
        engine.config().damage.flat_fallback_rate,
    );
    assert!(matches!(resolved.curve, DamageCurve::Table { .. }));
    let expected = engine
        .calculate_eai("Selangor", &curve, 1e9, &resolved.curve)
        .unwrap();
    assert_relative_eq!(
        result.expected_annual_impact,
        expected.expected_annual_impact,
        max_relative = 1e-12
    );
    assert!(result.uncertainty.is_some());
    let provenance = result.damage_function_provenance.unwrap();
    assert_eq!(provenance.tier, FunctionTier::Global);
    assert!(!provenance.used_fallback());
}

fn residential_rows(
    country_code: Option<&str>,
    region: Option<Region>,
    ratios: [f64; 3],
) -> Vec<DamageFunctionRow> {
    [0.0, 1.0, 3.0]
        .into_iter()
        .zip(ratios)
        .map(|(depth_m, damage_ratio)| DamageFunctionRow {
            building_type: BuildingType::Residential,
            country_code: country_code.map(str::to_string),
            region,
            depth_m,
            damage_ratio,
        })
        .collect()
}

fn engine_with_functions(rows: Vec<DamageFunctionRow>) -> FloodRiskEngine {
    let reference = ReferenceData::from_tables(ReferenceTables {
        damage_functions: Some(rows),
        ..ReferenceTables::default()
    })
    .unwrap();
    FloodRiskEngine::with_reference(EngineConfig::default(), reference).unwrap()
}

fn residential_eai_request(country_code: &str) -> EaiRequest {
    let mut request = EaiRequest::new("Selangor");
    request.exposure = Some(1e9);
    request.country_code = Some(country_code.into());
    request.building_type = Some(BuildingType::Residential);
    request
}

#[test]
fn test_location_eai_uses_country_damage_function() {
    let mut rows = residential_rows(None, None, [0.0, 0.1, 0.2]);
    rows.extend(residential_rows(Some("MY"), None, [0.0, 0.6, 1.0]));
    let engine = engine_with_functions(rows);

    // Alpha-3 code normalises to the MY table
    let result = engine
        .calculate_location_eai(&residential_eai_request("MYS"))
        .unwrap();

    let provenance = result.damage_function_provenance.clone().unwrap();
    assert_eq!(provenance.tier, FunctionTier::Country);
    assert_eq!(provenance.scope, Some(FunctionScope::Country("MY".into())));
    assert!(provenance.missed.is_empty());

    let curve = engine
        .build_hazard_curve("Selangor", result.scenario, None, HazardStrategy::Simulated)
        .unwrap();
    let country_curve: DamageCurve = DamageFunction::from_pairs(&[(0.0, 0.0), (1.0, 0.6), (3.0, 1.0)])
        .unwrap()
        .into();
    let global_curve: DamageCurve = DamageFunction::from_pairs(&[(0.0, 0.0), (1.0, 0.1), (3.0, 0.2)])
        .unwrap()
        .into();
    let with_country = engine
        .calculate_eai("Selangor", &curve, 1e9, &country_curve)
        .unwrap();
    let with_global = engine
        .calculate_eai("Selangor", &curve, 1e9, &global_curve)
        .unwrap();
    assert_relative_eq!(
        result.expected_annual_impact,
        with_country.expected_annual_impact,
        max_relative = 1e-12
    );
    assert!(result.expected_annual_impact > with_global.expected_annual_impact);
}

#[test]
fn test_location_eai_records_missed_country_tier() {
    let mut rows = residential_rows(None, None, [0.0, 0.1, 0.2]);
    rows.extend(residential_rows(None, Some(Region::Asia), [0.0, 0.4, 0.8]));
    let engine = engine_with_functions(rows);

    let result = engine
        .calculate_location_eai(&residential_eai_request("my"))
        .unwrap();
    let provenance = result.damage_function_provenance.unwrap();
    assert_eq!(provenance.tier, FunctionTier::Region);
    assert_eq!(provenance.scope, Some(FunctionScope::Region(Region::Asia)));
    assert_eq!(provenance.missed, vec![FunctionTier::Country]);
    assert!(provenance.used_fallback());
}
