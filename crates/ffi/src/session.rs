use rustc_hash::FxHashMap;
use std::os::raw::c_char;
use std::ptr;
use std::sync::Mutex;
use tracing::debug;

use crate::error::{DefaultFloodRiskError, FloodRiskErrorCode};
use crate::helpers::{instance_from_ptr, into_c_string, str_from_ptr, track_result};
use crate::instance::FloodRiskInstance;

/// Keyed payload storage for adapter-level session state.
///
/// The engine never reads this; callers stash intermediate results (hazard curves,
/// batch outputs) under their own keys between calls.
pub trait SessionStore: Send + Sync {
    /// Store `payload` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the in-memory store fails only on a poisoned lock.
    fn put(&self, key: &str, payload: String) -> Result<(), DefaultFloodRiskError>;

    /// Payload stored under `key`, `None` when absent.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the in-memory store fails only on a poisoned lock.
    fn get(&self, key: &str) -> Result<Option<String>, DefaultFloodRiskError>;
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: Mutex<FxHashMap<String, String>>,
}

impl SessionStore for InMemorySessionStore {
    fn put(&self, key: &str, payload: String) -> Result<(), DefaultFloodRiskError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DefaultFloodRiskError::lock_poisoned("session store"))?;
        debug!(key, bytes = payload.len(), "Storing session payload");
        entries.insert(key.to_string(), payload);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, DefaultFloodRiskError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| DefaultFloodRiskError::lock_poisoned("session store"))?;
        Ok(entries.get(key).cloned())
    }
}

/// Store a UTF-8 payload under `key`.
///
/// # Safety
/// - `instance` must be null or a live pointer from `flood_risk_new`.
/// - `key` and `payload` must be null or null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_session_put(
    instance: *const FloodRiskInstance,
    key: *const c_char,
    payload: *const c_char,
) -> FloodRiskErrorCode {
    // SAFETY: forwarded caller contract.
    match track_result(unsafe { session_put(instance, key, payload) }) {
        Ok(()) => FloodRiskErrorCode::Ok,
        Err(code) => code,
    }
}

unsafe fn session_put(
    instance: *const FloodRiskInstance,
    key: *const c_char,
    payload: *const c_char,
) -> Result<(), DefaultFloodRiskError> {
    // SAFETY: forwarded caller contract.
    let instance = unsafe { instance_from_ptr(instance) }?;
    let key = unsafe { str_from_ptr(key, "key") }?;
    let payload = unsafe { str_from_ptr(payload, "payload") }?;
    instance.sessions().put(key, payload.to_string())
}

/// Payload stored under `key` as an owned C string.
///
/// Returns null when the key is absent (`SessionNotFound`) or on error; the caller
/// frees a non-null result with `flood_risk_string_free`.
///
/// # Safety
/// - `instance` must be null or a live pointer from `flood_risk_new`.
/// - `key` must be null or a null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flood_risk_session_get(
    instance: *const FloodRiskInstance,
    key: *const c_char,
) -> *mut c_char {
    // SAFETY: forwarded caller contract.
    track_result(unsafe { session_get(instance, key) }).unwrap_or(ptr::null_mut())
}

unsafe fn session_get(
    instance: *const FloodRiskInstance,
    key: *const c_char,
) -> Result<*mut c_char, DefaultFloodRiskError> {
    // SAFETY: forwarded caller contract.
    let instance = unsafe { instance_from_ptr(instance) }?;
    let key = unsafe { str_from_ptr(key, "key") }?;
    match instance.sessions().get(key)? {
        Some(payload) => into_c_string(payload),
        None => Err(DefaultFloodRiskError::session_not_found(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store_round_trip() {
        let store = InMemorySessionStore::default();
        assert_eq!(store.get("curve").unwrap(), None);
        store.put("curve", "{\"rows\":[]}".to_string()).unwrap();
        store.put("curve", "{\"rows\":[1]}".to_string()).unwrap();
        assert_eq!(store.get("curve").unwrap().as_deref(), Some("{\"rows\":[1]}"));
    }
}
