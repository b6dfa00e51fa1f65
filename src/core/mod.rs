mod compare;
mod engine;
mod error;
mod params;
mod scenarios;
mod snapshot;
mod types;

pub use compare::{chart_rows, compare, project_all, rank_scenarios};
pub use engine::{LoanTracePoint, project, project_scenario, run_loan_trace};
pub use error::{EngineError, SnapshotError};
pub use params::{
    MAX_YEARS, ParamFormat, ParamGroup, ParamKey, ParamSpec, ParameterSet, param_specs,
};
pub use scenarios::{SCENARIO_CONFIGS, scenario_config};
pub use snapshot::{
    apply_overrides, export_snapshot, import_snapshot, load_snapshot_file, save_snapshot_file,
};
pub use types::{
    ChartKind, ChartRow, ChartValue, Comparison, FuelPenaltyMode, PaymentMode, ReplaceCycle,
    ScenarioConfig, ScenarioKey, ScenarioProjection, ScenarioSummary, YearRecord,
};
