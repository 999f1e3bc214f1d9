//! C ABI over the flood risk engine
//!
//! Every entry point clears or sets a thread-local last error
//! (`flood_risk_get_last_error`, `flood_risk_get_last_error_code`). Strings returned
//! by value are owned by the caller and freed with `flood_risk_string_free`.

mod error;
mod helpers;
mod instance;
mod queries;
mod session;

pub use error::{
    flood_risk_get_last_error, flood_risk_get_last_error_code, DefaultFloodRiskError,
    FloodRiskErrorCode,
};
pub use instance::{flood_risk_destroy, flood_risk_new, FloodRiskInstance};
pub use queries::{
    flood_risk_calculate_damage, flood_risk_calculate_damage_batch_json,
    flood_risk_calculate_eai_batch_json, flood_risk_event_probability,
    flood_risk_return_period_probability, flood_risk_string_free, FloodRiskDamage,
};
pub use session::{
    flood_risk_session_get, flood_risk_session_put, InMemorySessionStore, SessionStore,
};
