use tracing::debug;

use super::assumptions::Assumptions;
use super::events::{HouseholdState, LifeEvent, YearStep, roll_balance, step_year};
use super::types::{SimulatorInputs, Timeline, TimelineRow};

pub fn project(inputs: &SimulatorInputs) -> Timeline {
    project_with(inputs, &Assumptions::default())
}

pub fn project_with(inputs: &SimulatorInputs, assumptions: &Assumptions) -> Timeline {
    let years = inputs.projection_years(assumptions);
    let start_year = assumptions.resolved_start_year();

    let mut timeline = Vec::with_capacity(years as usize);
    let mut state = HouseholdState::default();
    let mut balance = inputs.savings_now;

    for index in 0..years {
        let step = step_year(inputs, assumptions, index, &mut state);
        log_events(&step);

        // Shortfalls below zero are dropped rather than cutting spending.
        balance = floor_at_zero(roll_balance(balance, &step.flows, inputs.expected_return));
        timeline.push(build_row(&step, start_year, balance));
    }

    timeline
}

pub(crate) fn floor_at_zero(balance: f64) -> f64 {
    if balance < 0.0 { 0.0 } else { balance }
}

fn build_row(step: &YearStep, start_year: i32, end_balance: f64) -> TimelineRow {
    let flows = &step.flows;
    TimelineRow {
        year: start_year + step.context.index as i32,
        age_primary: step.context.age_primary,
        age_spouse: step.context.age_spouse,
        income: flows.income,
        pensions_public: flows.pensions_public,
        pensions_public_spouse: flows.pensions_public_spouse,
        annuities_private: flows.annuities_private,
        spending: flows.spending,
        child_cost: flows.child_cost,
        mortgage: flows.mortgage,
        net_cash_flow: flows.net_cash_flow,
        end_balance,
        is_retired: step.state.retired,
        is_primary_deceased: step.state.primary_deceased,
        is_spouse_deceased: step.state.spouse_deceased,
    }
}

fn log_events(step: &YearStep) {
    let age = step.context.age_primary;
    for event in &step.events {
        match event {
            LifeEvent::ApplicantDeath {
                death_benefit,
                survivor_years,
            } => debug!(age, death_benefit, survivor_years, "applicant death"),
            LifeEvent::SpouseDeath => debug!(age, age_spouse = ?step.context.age_spouse, "spouse death"),
            LifeEvent::Retirement => debug!(age, "retirement"),
            LifeEvent::SurvivorBenefitEnded => debug!(age, "survivor benefit window closed"),
            LifeEvent::MortgagePaidOff => debug!(age, "mortgage paid off"),
        }
    }
}
