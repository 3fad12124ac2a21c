mod assumptions;
mod engine;
mod error;
mod events;
mod kpi;
mod percentiles;
mod report;
mod stochastic;
mod types;
mod validate;

pub use assumptions::{Assumptions, Preset, PresetValues, default_inputs};
pub use engine::{project, project_with};
pub use error::{InputError, SimulationError};
pub use events::{
    CashFlows, HouseholdState, LifeEvent, YearContext, YearStep, detect_events, roll_balance,
    step_year,
};
pub use kpi::{real_discount_rate, summarize, summarize_with};
pub use percentiles::{PERCENTILE_LEVELS, nearest_rank, percentile_bands};
pub use report::{run_simulation, run_simulation_with};
pub use stochastic::{
    CancelToken, DEFAULT_SEED, StochasticOptions, derive_seed, project_stochastic,
    project_stochastic_cancellable, project_stochastic_with, project_stochastic_with_rng,
    sample_normal_return,
};
pub use types::{
    Gender, KpiResults, MonteCarloResults, PercentileBands, SimulationReport, SimulatorInputs,
    Spouse, Timeline, TimelineRow, ValidationReport, ValidationWarning,
};
pub use validate::{MAX_MODELLED_AGE, check_ranges, range_warnings, validate, validate_with};
