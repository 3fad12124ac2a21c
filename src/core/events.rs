use super::assumptions::Assumptions;
use super::types::SimulatorInputs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HouseholdState {
    pub retired: bool,
    pub primary_deceased: bool,
    pub spouse_deceased: bool,
    pub survivor_years_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifeEvent {
    // Applicant reaches their death age. `survivor_years` is the benefit
    // window opened for a surviving spouse, zero if there is none.
    ApplicantDeath { death_benefit: f64, survivor_years: u32 },
    SpouseDeath,
    Retirement,
    SurvivorBenefitEnded,
    MortgagePaidOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearContext {
    pub index: u32,
    pub age_primary: u32,
    pub age_spouse: Option<u32>,
}

impl YearContext {
    pub fn new(inputs: &SimulatorInputs, index: u32) -> Self {
        Self {
            index,
            age_primary: inputs.applicant_age + index,
            age_spouse: inputs.spouse_age().map(|age| age + index),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CashFlows {
    pub income: f64,
    pub pensions_public: f64,
    pub pensions_public_spouse: f64,
    pub annuities_private: f64,
    pub spending: f64,
    pub child_cost: f64,
    pub mortgage: f64,
    pub net_cash_flow: f64,
    // One-time amount credited to the balance before this year's return.
    pub lump_sum: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearStep {
    pub context: YearContext,
    pub events: Vec<LifeEvent>,
    pub state: HouseholdState,
    pub flows: CashFlows,
}

// Application order matters: deaths, then retirement, then mortgage payoff.
pub fn detect_events(
    inputs: &SimulatorInputs,
    ctx: &YearContext,
    state: &HouseholdState,
) -> Vec<LifeEvent> {
    let mut events = Vec::new();

    if !state.primary_deceased
        && inputs
            .death_age_primary
            .is_some_and(|death_age| ctx.age_primary >= death_age)
    {
        let survivor_years = if inputs.spouse.has_spouse && !state.spouse_deceased {
            inputs.survivor_benefit_min_years
        } else {
            0
        };
        events.push(LifeEvent::ApplicantDeath {
            death_benefit: inputs.death_benefits(),
            survivor_years,
        });
    }

    if !state.spouse_deceased
        && inputs.spouse.has_spouse
        && let (Some(age_spouse), Some(death_age)) = (ctx.age_spouse, inputs.death_age_spouse)
        && age_spouse >= death_age
    {
        events.push(LifeEvent::SpouseDeath);
    }

    if !state.retired && ctx.age_primary >= inputs.retire_age {
        events.push(LifeEvent::Retirement);
    }

    if inputs.mortgage_annual > 0.0 && ctx.index > 0 && ctx.age_primary == inputs.mortgage_end_age()
    {
        events.push(LifeEvent::MortgagePaidOff);
    }

    events
}

impl HouseholdState {
    pub fn apply(&mut self, event: &LifeEvent) -> f64 {
        match *event {
            LifeEvent::ApplicantDeath {
                death_benefit,
                survivor_years,
            } => {
                self.primary_deceased = true;
                if survivor_years > 0 {
                    self.survivor_years_remaining = survivor_years;
                }
                death_benefit
            }
            LifeEvent::SpouseDeath => {
                self.spouse_deceased = true;
                0.0
            }
            LifeEvent::Retirement => {
                self.retired = true;
                0.0
            }
            LifeEvent::SurvivorBenefitEnded | LifeEvent::MortgagePaidOff => 0.0,
        }
    }

    pub fn is_working(&self) -> bool {
        !self.primary_deceased && !self.retired
    }
}

pub fn step_year(
    inputs: &SimulatorInputs,
    assumptions: &Assumptions,
    index: u32,
    state: &mut HouseholdState,
) -> YearStep {
    let ctx = YearContext::new(inputs, index);
    let mut events = detect_events(inputs, &ctx, state);

    let mut lump_sum = 0.0;
    for event in &events {
        lump_sum += state.apply(event);
    }

    let income = if state.is_working() {
        inputs.current_gross_income * (1.0 + inputs.salary_growth_rate).powf(f64::from(index))
    } else {
        0.0
    };

    let pension_age = assumptions.statutory_pension_start_age;
    let pensions_public = if !state.primary_deceased && ctx.age_primary >= pension_age {
        inputs.base_public_pension() + inputs.earnings_related_pension()
    } else {
        0.0
    };

    let spouse_alive = inputs.spouse.has_spouse && !state.spouse_deceased;
    let mut pensions_public_spouse = 0.0;
    if spouse_alive && ctx.age_spouse.is_some_and(|age| age >= pension_age) {
        pensions_public_spouse += inputs.base_public_pension() * assumptions.spouse_base_pension_share;
    }
    if state.primary_deceased && !state.spouse_deceased && state.survivor_years_remaining > 0 {
        pensions_public_spouse += inputs.base_public_pension() * inputs.survivor_benefit_rate;
        state.survivor_years_remaining -= 1;
        if state.survivor_years_remaining == 0 {
            events.push(LifeEvent::SurvivorBenefitEnded);
        }
    }

    let annuities_private =
        if !state.primary_deceased && ctx.age_primary >= inputs.private_annuity_start_age {
            inputs.private_annuity_annual
        } else {
            0.0
        };

    let spending = if state.retired {
        inputs.retirement_spending()
    } else {
        inputs.current_annual_spending
    };

    let child_cost = inputs
        .children_ages
        .iter()
        .filter(|&&child_age| child_age + index <= assumptions.child_cost_last_age)
        .count() as f64
        * inputs.child_cost_per_year;

    let mortgage = if inputs.mortgage_annual > 0.0 && ctx.age_primary < inputs.mortgage_end_age() {
        inputs.mortgage_annual
    } else {
        0.0
    };

    let receipts = income + pensions_public + pensions_public_spouse + annuities_private;
    let mut net_cash_flow = receipts - (spending + child_cost + mortgage);
    if state.is_working() {
        net_cash_flow += inputs.annual_private_saving;
    }

    YearStep {
        context: ctx,
        events,
        state: *state,
        flows: CashFlows {
            income,
            pensions_public,
            pensions_public_spouse,
            annuities_private,
            spending,
            child_cost,
            mortgage,
            net_cash_flow,
            lump_sum,
        },
    }
}

// End-of-year balance before flooring; may be negative.
pub fn roll_balance(balance: f64, flows: &CashFlows, annual_return: f64) -> f64 {
    (balance + flows.lump_sum) * (1.0 + annual_return) + flows.net_cash_flow
}
