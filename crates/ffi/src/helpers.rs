use crate::error::{with_last_error_mut, DefaultFloodRiskError, FloodRiskErrorCode, FloodRiskFfiError};
use crate::instance::FloodRiskInstance;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl FloodRiskFfiError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Record `error` in thread-local storage and return its code.
#[inline]
pub(crate) fn track_error(error: &impl FloodRiskFfiError) -> FloodRiskErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called at the start of every fallible entry point.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = FloodRiskErrorCode::Ok;
    });
}

/// Clear or record the last error according to `result`.
pub(crate) fn track_result<T, E>(result: Result<T, E>) -> Result<T, FloodRiskErrorCode>
where
    E: Into<DefaultFloodRiskError>,
{
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error.into())),
    }
}

/// Borrow the instance behind `ptr`.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `flood_risk_new`.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const FloodRiskInstance,
) -> Result<&'a FloodRiskInstance, DefaultFloodRiskError> {
    // SAFETY: the caller guarantees `ptr` is null or came from `Box::into_raw`.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultFloodRiskError::null_pointer("instance"))
}

/// Borrow a null-terminated UTF-8 argument.
///
/// # Safety
/// `ptr` must be null or point to a null-terminated string that outlives `'a`.
pub(crate) unsafe fn str_from_ptr<'a>(
    ptr: *const c_char,
    param_name: &str,
) -> Result<&'a str, DefaultFloodRiskError> {
    if ptr.is_null() {
        return Err(DefaultFloodRiskError::null_pointer(param_name));
    }
    // SAFETY: non-null and null-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| DefaultFloodRiskError::invalid_utf8(param_name))
}

/// Like [`str_from_ptr`] but a null pointer means "absent".
///
/// # Safety
/// Same contract as [`str_from_ptr`].
pub(crate) unsafe fn optional_str_from_ptr<'a>(
    ptr: *const c_char,
    param_name: &str,
) -> Result<Option<&'a str>, DefaultFloodRiskError> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: forwarded caller contract.
    unsafe { str_from_ptr(ptr, param_name) }.map(Some)
}

/// Hand an owned string to C; free with `flood_risk_string_free`.
pub(crate) fn into_c_string(value: String) -> Result<*mut c_char, DefaultFloodRiskError> {
    CString::new(value)
        .map(CString::into_raw)
        .map_err(|_| DefaultFloodRiskError::invalid_parameter("output contains a NUL byte".into()))
}

/// Write `value` through `out` or record a null-pointer error.
///
/// # Safety
/// `out` must be null or valid for writes.
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T, param_name: &str) -> FloodRiskErrorCode {
    if out.is_null() {
        return track_error(&DefaultFloodRiskError::null_pointer(param_name));
    }
    // SAFETY: non-null and writable per the caller's contract.
    unsafe { ptr::write(out, value) };
    FloodRiskErrorCode::Ok
}
