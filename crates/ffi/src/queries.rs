use flood_risk_core::{BuildingType, DamageRequest, DamageResult, ReturnPeriod};
use serde::Serialize;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use tracing::debug;

use crate::error::{DefaultFloodRiskError, FloodRiskErrorCode};
use crate::helpers::{
    instance_from_ptr, into_c_string, optional_str_from_ptr, str_from_ptr, track_error,
    track_result, write_out,
};
use crate::instance::FloodRiskInstance;

#[repr(C)]
/// FFI-friendly summary of one damage calculation.
/// Keep this layout stable for C/C++/C# consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodRiskDamage {
    /// Damage ratio in [0, 1].
    pub damage_ratio: f64,

    /// Economic damage in the local currency.
    pub economic_damage: f64,

    /// Asset value (`value_per_m2 × area_m2`).
    pub total_value: f64,

    pub value_per_m2: f64,

    pub area_m2: f64,

    /// Lower bound of the 95% interval, `NaN` when uncertainty was not requested.
    pub ci95_lower: f64,

    /// Upper bound of the 95% interval, `NaN` when uncertainty was not requested.
    pub ci95_upper: f64,

    /// Whether any fallback (default economics, generic damage function) was used.
    pub used_fallback: bool,
}

impl From<&DamageResult> for FloodRiskDamage {
    fn from(result: &DamageResult) -> Self {
        let (ci95_lower, ci95_upper) = result
            .uncertainty
            .map_or((f64::NAN, f64::NAN), |u| (u.ci95.lower, u.ci95.upper));
        Self {
            damage_ratio: result.damage_ratio,
            economic_damage: result.economic_damage,
            total_value: result.total_value,
            value_per_m2: result.value_per_m2,
            area_m2: result.area_m2,
            ci95_lower,
            ci95_upper,
            used_fallback: result.provenance.used_fallback(),
        }
    }
}

/// Probability of at least one event within `window_days` given `event_count` event
/// days over `total_days`.
///
/// Returns `NaN` when `instance` is null.
///
/// # Safety
/// `instance` must be null or a live pointer from `flood_risk_new`.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_event_probability(
    instance: *const FloodRiskInstance,
    event_count: u64,
    total_days: u64,
    window_days: u32,
) -> f64 {
    // SAFETY: forwarded caller contract.
    match track_result(unsafe { instance_from_ptr(instance) }) {
        Ok(instance) => instance
            .engine()
            .event_probability(event_count, total_days, window_days),
        Err(_) => f64::NAN,
    }
}

/// Probability of at least one `return_period_years` event within `window_days`.
///
/// Returns `NaN` when `instance` is null or the return period is below 1 year.
///
/// # Safety
/// `instance` must be null or a live pointer from `flood_risk_new`.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_return_period_probability(
    instance: *const FloodRiskInstance,
    return_period_years: u32,
    window_days: f64,
) -> f64 {
    // SAFETY: forwarded caller contract.
    let result = unsafe { instance_from_ptr(instance) }.and_then(|instance| {
        let return_period = ReturnPeriod::new(return_period_years)?;
        Ok(instance
            .engine()
            .return_period_probability(return_period, window_days))
    });
    track_result(result).unwrap_or(f64::NAN)
}

/// Economic damage for one asset.
///
/// # Parameters
/// - `latitude`, `longitude`: asset location in degrees
/// - `flood_depth`: water depth in meters
/// - `building_type`: building type identifier (e.g. `"residential"`), or null for the default
/// - `area_m2`: floor area, or `NaN` for the configured default
/// - `country_code`: ISO alpha-2 or alpha-3 code, or null to infer from coordinates
/// - `out_damage`: receives the result
///
/// # Safety
/// - `instance` must be null or a live pointer from `flood_risk_new`.
/// - `building_type` and `country_code` must be null or null-terminated strings.
/// - `out_damage` must be a valid pointer to writable memory.
#[no_mangle]
#[expect(clippy::too_many_arguments)]
pub unsafe extern "C" fn flood_risk_calculate_damage(
    instance: *const FloodRiskInstance,
    latitude: f64,
    longitude: f64,
    flood_depth: f64,
    building_type: *const c_char,
    area_m2: f64,
    country_code: *const c_char,
    out_damage: *mut FloodRiskDamage,
) -> FloodRiskErrorCode {
    if out_damage.is_null() {
        return track_error(&DefaultFloodRiskError::null_pointer("out_damage"));
    }
    // SAFETY: forwarded caller contract.
    let result = unsafe {
        calculate_damage(
            instance,
            DamageArgs {
                latitude,
                longitude,
                flood_depth,
                building_type,
                area_m2,
                country_code,
            },
        )
    };
    match track_result(result) {
        // SAFETY: checked non-null above.
        Ok(damage) => unsafe { write_out(out_damage, damage, "out_damage") },
        Err(code) => code,
    }
}

#[derive(Clone, Copy)]
struct DamageArgs {
    latitude: f64,
    longitude: f64,
    flood_depth: f64,
    building_type: *const c_char,
    area_m2: f64,
    country_code: *const c_char,
}

unsafe fn calculate_damage(
    instance: *const FloodRiskInstance,
    args: DamageArgs,
) -> Result<FloodRiskDamage, DefaultFloodRiskError> {
    // SAFETY: forwarded caller contract.
    let instance = unsafe { instance_from_ptr(instance) }?;
    let building_type = unsafe { optional_str_from_ptr(args.building_type, "building_type") }?
        .map(str::parse::<BuildingType>)
        .transpose()?;
    let country_code = unsafe { optional_str_from_ptr(args.country_code, "country_code") }?;

    let mut request = DamageRequest::new(args.latitude, args.longitude, args.flood_depth);
    request.building_type = building_type;
    request.country_code = country_code.map(str::to_string);
    request.area_m2 = (!args.area_m2.is_nan()).then_some(args.area_m2);

    let result = instance.engine().calculate_damage(&request)?;
    Ok(FloodRiskDamage::from(&result))
}

/// Damage for a JSON array of request objects.
///
/// Returns a JSON array index-aligned with the input; each entry is
/// `{"index", "status": "ok", "result"}` or `{"index", "status": "error", "error"}`.
/// Free the result with `flood_risk_string_free`. Returns null when the input is not
/// a JSON array.
///
/// # Safety
/// - `instance` must be null or a live pointer from `flood_risk_new`.
/// - `requests_json` must be null or a null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_calculate_damage_batch_json(
    instance: *const FloodRiskInstance,
    requests_json: *const c_char,
) -> *mut c_char {
    // SAFETY: forwarded caller contract.
    let result = unsafe { batch_json(instance, requests_json, |instance, requests| {
        let items = instance.engine().calculate_damage_batch_values(requests);
        let summary = instance.engine().summarize_damage(&items);
        debug!(
            valid = summary.valid_calculations,
            failed = summary.failed_calculations,
            "Damage batch complete"
        );
        to_json(&items)
    }) };
    track_result(result).unwrap_or(ptr::null_mut())
}

/// Expected annual impact for a JSON array of request objects.
///
/// Same output shape and ownership as `flood_risk_calculate_damage_batch_json`.
///
/// # Safety
/// - `instance` must be null or a live pointer from `flood_risk_new`.
/// - `requests_json` must be null or a null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_calculate_eai_batch_json(
    instance: *const FloodRiskInstance,
    requests_json: *const c_char,
) -> *mut c_char {
    // SAFETY: forwarded caller contract.
    let result = unsafe { batch_json(instance, requests_json, |instance, requests| {
        to_json(&instance.engine().calculate_eai_batch_values(requests))
    }) };
    track_result(result).unwrap_or(ptr::null_mut())
}

unsafe fn batch_json<F>(
    instance: *const FloodRiskInstance,
    requests_json: *const c_char,
    run: F,
) -> Result<*mut c_char, DefaultFloodRiskError>
where
    F: FnOnce(&FloodRiskInstance, &[serde_json::Value]) -> Result<String, DefaultFloodRiskError>,
{
    // SAFETY: forwarded caller contract.
    let instance = unsafe { instance_from_ptr(instance) }?;
    let json = unsafe { str_from_ptr(requests_json, "requests_json") }?;
    let requests: Vec<serde_json::Value> = serde_json::from_str(json).map_err(|e| {
        DefaultFloodRiskError::invalid_parameter(format!("requests_json must be a JSON array: {e}"))
    })?;
    into_c_string(run(instance, &requests)?)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, DefaultFloodRiskError> {
    serde_json::to_string(value)
        .map_err(|e| DefaultFloodRiskError::invalid_parameter(format!("serialising results: {e}")))
}

/// Free a string returned by this library. Null is a no-op.
///
/// # Safety
/// `ptr` must be null or a pointer returned by a `flood_risk_*` function that
/// transfers ownership, not freed already.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_string_free(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: `ptr` came from `CString::into_raw` and is freed once.
    unsafe {
        drop(CString::from_raw(ptr));
    }
}
