use flood_risk_core::{ErrorKind, FloodRiskError};
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - Returns the error code passed across the FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait FloodRiskFfiError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> FloodRiskErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Error code plus message, for failures raised by the adapter itself and for engine
/// errors crossing the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultFloodRiskError {
    code: FloodRiskErrorCode,
    msg: String,
}

impl DefaultFloodRiskError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: FloodRiskErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    ///
    /// # Arguments
    /// * `lock_name` - The name of the lock that was poisoned (e.g., `"session store"`)
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: FloodRiskErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for a C string argument that is not valid UTF-8.
    pub fn invalid_utf8(param_name: &str) -> Self {
        Self {
            code: FloodRiskErrorCode::InvalidUtf8,
            msg: format!("Parameter '{param_name}' is not valid UTF-8"),
        }
    }

    /// Create error for invalid parameter.
    ///
    /// # Arguments
    /// * `message` - Description of the error
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: FloodRiskErrorCode::InvalidParameter,
            msg: message,
        }
    }

    /// Create error for a session key with no stored payload.
    pub fn session_not_found(key: &str) -> Self {
        Self {
            code: FloodRiskErrorCode::SessionNotFound,
            msg: format!("No session payload stored under '{key}'"),
        }
    }

    pub fn code(&self) -> FloodRiskErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl FloodRiskFfiError for DefaultFloodRiskError {
    fn code(&self) -> FloodRiskErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<FloodRiskError> for DefaultFloodRiskError {
    fn from(error: FloodRiskError) -> Self {
        Self {
            code: error.kind().into(),
            msg: error.to_string(),
        }
    }
}

/// FFI error codes returned by flood risk functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodRiskErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function (malformed JSON, unknown enum value).
    InvalidParameter = 3,

    /// A C string argument is not valid UTF-8.
    InvalidUtf8 = 4,

    /// Input outside its valid range (coordinates, depth, area, missing field).
    Validation = 5,

    /// Too few samples or control points for the computation.
    InsufficientData = 6,

    /// GEV fit did not produce usable parameters.
    FitConvergence = 7,

    /// A reference table entry is absent.
    DataNotFound = 8,

    /// Exposure is zero or negative.
    ZeroExposure = 9,

    /// Configuration or reference-table JSON failed to parse or validate.
    InvalidConfig = 10,

    /// No payload stored under the requested session key.
    SessionNotFound = 11,
}

impl From<ErrorKind> for FloodRiskErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => Self::Validation,
            ErrorKind::InsufficientData => Self::InsufficientData,
            ErrorKind::FitConvergence => Self::FitConvergence,
            ErrorKind::DataNotFound => Self::DataNotFound,
            ErrorKind::ZeroExposure => Self::ZeroExposure,
            ErrorKind::InvalidConfig => Self::InvalidConfig,
        }
    }
}

impl From<DefaultFloodRiskError> for FloodRiskErrorCode {
    fn from(error: DefaultFloodRiskError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (C string, error code).
    /// The `CString` is kept here so the pointer handed out stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, FloodRiskErrorCode)> = const { RefCell::new((None, FloodRiskErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, FloodRiskErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, FloodRiskErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if the last call on this thread succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// FloodRiskInstance* engine = NULL;
/// if (flood_risk_new(config_json, NULL, &engine) != FloodRiskErrorCode_Ok) {
///     const char* error = flood_risk_get_last_error();
///     if (error) {
///         printf("Engine creation failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn flood_risk_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code, `Ok` when the last call succeeded.
#[no_mangle]
pub extern "C" fn flood_risk_get_last_error_code() -> FloodRiskErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
