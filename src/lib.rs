//! Synheart Cycle - On-device cycle prediction engine
//!
//! Cycle turns a menstrual period history into forecasts through a
//! deterministic pipeline: source adaptation → cycle statistics → next-period
//! prediction → fertility window → insights → report encoding.
//!
//! ## Modules
//!
//! - **Engine**: pure functions over an immutable history (`statistics`,
//!   `predictor`, `insights`). Every function that depends on the current day
//!   takes it as an explicit `today`.
//! - **Edges**: source adapters for device flow samples and remote period rows,
//!   a recompute-on-write store, report encoding, and C bindings.

pub mod adapters;
pub mod encoder;
pub mod error;
pub mod insights;
pub mod pipeline;
pub mod predictor;
pub mod statistics;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::CycleError;
pub use insights::generate_insights;
pub use pipeline::{forecast_from_json, health_samples_to_history};
pub use predictor::{
    is_in_fertility_window, predict_fertility_window, predict_next_period, OvulationAnchor,
};
pub use store::{build_snapshot, CycleStore};
pub use types::{
    ConfidenceLevel, CycleHistory, CycleInsights, CyclePrediction, CycleSnapshot,
    FertilityPrediction, FlowIntensity, PeriodRecord, Severity, SymptomRecord,
};

/// Cycle version embedded in all reports
pub const CYCLE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "synheart-cycle";
