use flood_risk_core::{EngineConfig, FloodRiskEngine, ReferenceData};
use std::os::raw::c_char;
use std::ptr;

use crate::error::{DefaultFloodRiskError, FloodRiskErrorCode};
use crate::helpers::{optional_str_from_ptr, track_error, track_result};
use crate::session::{InMemorySessionStore, SessionStore};

/// Engine handle owned by a C caller.
///
/// # Thread Safety
/// The engine is immutable after creation and the session store synchronises
/// internally, so one instance may be shared by any number of threads.
///
/// ```c
/// FloodRiskInstance* engine = NULL;
/// if (flood_risk_new(NULL, NULL, &engine) != FloodRiskErrorCode_Ok) {
///     fprintf(stderr, "%s\n", flood_risk_get_last_error());
///     return;
/// }
/// double p = flood_risk_event_probability(engine, 150, 3650, 365);
/// flood_risk_destroy(engine);
/// ```
pub struct FloodRiskInstance {
    engine: FloodRiskEngine,
    sessions: Box<dyn SessionStore>,
}

impl FloodRiskInstance {
    /// Instance over `engine` with an in-memory session store.
    pub fn new(engine: FloodRiskEngine) -> Self {
        Self::with_session_store(engine, Box::new(InMemorySessionStore::default()))
    }

    pub fn with_session_store(engine: FloodRiskEngine, sessions: Box<dyn SessionStore>) -> Self {
        Self { engine, sessions }
    }

    /// Build an engine from optional configuration and reference-table JSON.
    ///
    /// # Errors
    ///
    /// Returns the engine's `InvalidConfig` error when either document fails to parse
    /// or validate.
    pub fn from_json(
        config_json: Option<&str>,
        reference_json: Option<&str>,
    ) -> Result<Self, DefaultFloodRiskError> {
        let config = config_json
            .map(EngineConfig::from_json_str)
            .transpose()?
            .unwrap_or_default();
        let reference = reference_json
            .map(ReferenceData::from_json_str)
            .transpose()?
            .unwrap_or_default();
        Ok(Self::new(FloodRiskEngine::with_reference(config, reference)?))
    }

    pub fn engine(&self) -> &FloodRiskEngine {
        &self.engine
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}

/// Create an engine instance.
///
/// # Parameters
/// - `config_json`: engine configuration document, or null for defaults
/// - `reference_json`: reference-table document, or null for the built-in tables
/// - `out_instance`: receives the new instance, set to null on error
///
/// # Safety
/// - `config_json` and `reference_json` must be null or null-terminated strings.
/// - `out_instance` must be a valid pointer to writable memory.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_new(
    config_json: *const c_char,
    reference_json: *const c_char,
    out_instance: *mut *mut FloodRiskInstance,
) -> FloodRiskErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultFloodRiskError::null_pointer("out_instance"));
    }

    // SAFETY: both strings are null or null-terminated per the caller's contract.
    let created = unsafe {
        optional_str_from_ptr(config_json, "config_json").and_then(|config| {
            optional_str_from_ptr(reference_json, "reference_json")
                .and_then(|reference| FloodRiskInstance::from_json(config, reference))
        })
    };

    match track_result(created) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(Box::new(instance));
            }
            FloodRiskErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroy an instance created by `flood_risk_new`. Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `flood_risk_new` and not freed already.
/// - The caller must not use the pointer afterwards.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_destroy(ptr: *mut FloodRiskInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: `ptr` came from `Box::into_raw` in `flood_risk_new` and is freed once.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_create_with_partial_config() {
        let config = CString::new(r#"{ "validation": { "max_flood_depth_m": 10.0 } }"#).unwrap();
        let mut instance = ptr::null_mut();
        let code = unsafe { flood_risk_new(config.as_ptr(), ptr::null(), &mut instance) };
        assert_eq!(code, FloodRiskErrorCode::Ok);
        assert!(!instance.is_null());
        let max_depth = unsafe { &*instance }.engine().config().validation.max_flood_depth_m;
        assert_eq!(max_depth, 10.0);
        unsafe { flood_risk_destroy(instance) };
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let config = CString::new("{ not json").unwrap();
        let mut instance = ptr::null_mut();
        let code = unsafe { flood_risk_new(config.as_ptr(), ptr::null(), &mut instance) };
        assert_eq!(code, FloodRiskErrorCode::InvalidConfig);
        assert!(instance.is_null());
        assert_eq!(
            crate::error::flood_risk_get_last_error_code(),
            FloodRiskErrorCode::InvalidConfig
        );
    }
}
