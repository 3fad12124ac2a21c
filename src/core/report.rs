use super::assumptions::Assumptions;
use super::engine::project_with;
use super::error::SimulationError;
use super::kpi::summarize_with;
use super::stochastic::{CancelToken, StochasticOptions, project_stochastic_cancellable};
use super::types::{SimulationReport, SimulatorInputs};
use super::validate::validate_with;

pub fn run_simulation(
    inputs: &SimulatorInputs,
    stochastic: Option<StochasticOptions>,
) -> SimulationReport {
    let token = CancelToken::new();
    match run_simulation_with(inputs, &Assumptions::default(), stochastic, &token) {
        Ok(report) => report,
        Err(err) => unreachable!("a private cancel token was triggered: {err}"),
    }
}

pub fn run_simulation_with(
    inputs: &SimulatorInputs,
    assumptions: &Assumptions,
    stochastic: Option<StochasticOptions>,
    cancel: &CancelToken,
) -> Result<SimulationReport, SimulationError> {
    let warnings = validate_with(inputs, assumptions).warnings;
    let timeline = project_with(inputs, assumptions);

    let monte_carlo = stochastic
        .map(|options| project_stochastic_cancellable(inputs, assumptions, options, cancel))
        .transpose()?;
    let ruin_probability = monte_carlo.as_ref().map(|mc| mc.ruin_probability);
    let kpis = summarize_with(&timeline, inputs, ruin_probability, assumptions);

    Ok(SimulationReport {
        timeline,
        kpis,
        monte_carlo,
        warnings,
    })
}
