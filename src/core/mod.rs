mod doubling;
mod error;
mod metrics;
mod projection;
mod types;
mod yields;

pub use doubling::{DEFAULT_THRESHOLDS, analyze_doubling_time};
pub use error::EngineError;
pub use metrics::{
    calculate_fire_metrics, calculate_planned_fire_metrics, default_scenarios, fire_number,
};
pub use projection::{POST_FIRE_TAIL_YEARS, calculate_fire_projection};
pub use types::{
    Asset, DividendRecord, DoublingMode, DoublingTimeSummary, FireMetrics, Milestone,
    MilestoneInProgress, NetWorthPoint, PlannedFireMetrics, ProjectionResult, ProjectionYear,
    Scenario, ScenarioSet, ScenarioYear, YieldBasis, YieldMetrics,
};
pub use yields::{calculate_current_yield_metrics, calculate_yoc_metrics};
