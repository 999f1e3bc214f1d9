//! Typed error taxonomy for the flood-risk engine
//!
//! Every fallible operation in the core returns [`Result`]. Variants carry enough
//! structured context (field, threshold, table, key) for an adapter layer to build a
//! user-facing message without re-deriving it.

use serde::Serialize;
use thiserror::Error;

/// Errors produced by the hazard, damage and impact computations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FloodRiskError {
    /// Malformed or out-of-range input (coordinates, depth, area, missing field).
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending input field
        field: &'static str,
        /// Violated constraint, rendered with the offending value
        reason: String,
    },

    /// Too few samples or control points to compute anything meaningful.
    #[error("insufficient data for {what}: need at least {required}, got {actual}")]
    InsufficientData {
        /// What was being computed
        what: &'static str,
        /// Minimum number of values required
        required: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// GEV maximum-likelihood fit did not produce usable parameters.
    #[error("GEV fit did not converge: {reason}")]
    FitConvergence {
        /// Why the fit was rejected
        reason: String,
    },

    /// A requested reference table entry is absent.
    #[error("no entry for '{key}' in {table}")]
    DataNotFound {
        /// Reference table that was searched
        table: &'static str,
        /// Key that was looked up
        key: String,
    },

    /// Exposure is zero or negative, so no impact ratio exists.
    #[error("exposure must be positive to compute an impact ratio, got {exposure}")]
    ZeroExposure {
        /// The offending exposure value
        exposure: f64,
    },

    /// Configuration or reference-table document failed to parse or validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Fieldless discriminant of [`FloodRiskError`], stable across releases.
///
/// Adapter layers map this onto their own error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InsufficientData,
    FitConvergence,
    DataNotFound,
    ZeroExposure,
    InvalidConfig,
}

impl FloodRiskError {
    /// Build a validation error for `field`.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::FitConvergence { .. } => ErrorKind::FitConvergence,
            Self::DataNotFound { .. } => ErrorKind::DataNotFound,
            Self::ZeroExposure { .. } => ErrorKind::ZeroExposure,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}

impl From<serde_json::Error> for FloodRiskError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = FloodRiskError> = std::result::Result<T, E>;
