//! Impact aggregation: expected annual impact and loss uncertainty

pub mod eai;
pub mod uncertainty;

pub use eai::{calculate_eai, linear_impact_curve, EaiResult, ReturnPeriodImpact, TOTAL_LOSS_DEPTH_M};
pub use uncertainty::{Interval, UncertaintyBounds, Z_95};
