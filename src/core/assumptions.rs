use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::types::{Gender, SimulatorInputs, Spouse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Assumptions {
    pub statutory_pension_start_age: u32,
    pub basic_pension_full_amount_default: f64,
    pub min_discount_rate: f64,
    pub monte_carlo_iterations: u32,
    // Death age used when none is given, and the projection ceiling.
    pub max_age: u32,
    pub survivor_benefit_min_years_default: u32,
    pub min_basic_pension_coverage: f64,
    pub min_retire_age_gap: u32,
    pub conventional_survivor_benefit_rate: f64,
    // Share of the base pension paid to a spouse of pension age.
    pub spouse_base_pension_share: f64,
    // Last child age that still incurs child cost.
    pub child_cost_last_age: u32,
    // Calendar year of row 0; the current local year when unset.
    pub start_year: Option<i32>,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            statutory_pension_start_age: 65,
            basic_pension_full_amount_default: 816_000.0,
            min_discount_rate: 0.005,
            monte_carlo_iterations: 500,
            max_age: 100,
            survivor_benefit_min_years_default: 10,
            min_basic_pension_coverage: 0.6,
            min_retire_age_gap: 1,
            conventional_survivor_benefit_rate: 0.5,
            spouse_base_pension_share: 0.5,
            child_cost_last_age: 22,
            start_year: None,
        }
    }
}

impl Assumptions {
    pub fn resolved_start_year(&self) -> i32 {
        self.start_year.unwrap_or_else(|| chrono::Local::now().year())
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Preset {
    Conservative,
    #[default]
    Base,
    Aggressive,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PresetValues {
    pub expected_return: f64,
    pub inflation_rate: f64,
    pub salary_growth_rate: f64,
    // Percent, like `SimulatorInputs::volatility`.
    pub volatility: f64,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Conservative, Preset::Base, Preset::Aggressive];

    pub fn values(self) -> PresetValues {
        match self {
            Preset::Conservative => PresetValues {
                expected_return: 0.015,
                inflation_rate: 0.01,
                salary_growth_rate: 0.005,
                volatility: 8.0,
            },
            Preset::Base => PresetValues {
                expected_return: 0.03,
                inflation_rate: 0.015,
                salary_growth_rate: 0.01,
                volatility: 10.0,
            },
            Preset::Aggressive => PresetValues {
                expected_return: 0.045,
                inflation_rate: 0.02,
                salary_growth_rate: 0.015,
                volatility: 15.0,
            },
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Preset::Conservative => "Low risk, low return; bond-heavy portfolio",
            Preset::Base => "Balanced mix of equities and bonds",
            Preset::Aggressive => "High risk, high return; equity-heavy portfolio",
        }
    }

    pub fn apply(self, inputs: &mut SimulatorInputs) {
        let values = self.values();
        inputs.expected_return = values.expected_return;
        inputs.inflation_rate = values.inflation_rate;
        inputs.salary_growth_rate = values.salary_growth_rate;
        inputs.volatility = values.volatility;
    }
}

pub fn default_inputs() -> SimulatorInputs {
    let assumptions = Assumptions::default();
    let mut inputs = SimulatorInputs {
        applicant_age: 40,
        gender: Gender::Male,
        spouse: Spouse::none(),
        children_ages: Vec::new(),
        retire_age: 65,
        death_age_primary: None,
        death_age_spouse: None,
        current_gross_income: 6_000_000.0,
        salary_growth_rate: 0.0,
        savings_now: 5_000_000.0,
        annual_private_saving: 1_200_000.0,
        expected_return: 0.0,
        volatility: 0.0,
        inflation_rate: 0.0,
        basic_pension_full_amount: assumptions.basic_pension_full_amount_default,
        basic_pension_coverage: 1.0,
        earnings_related_factor: 0.005481,
        avg_standard_remuneration: 400_000.0,
        survivor_benefit_rate: assumptions.conventional_survivor_benefit_rate,
        survivor_benefit_min_years: assumptions.survivor_benefit_min_years_default,
        private_annuity_start_age: 65,
        private_annuity_annual: 0.0,
        whole_life_death_benefit: 10_000_000.0,
        term_life_death_benefit: 0.0,
        current_annual_spending: 3_600_000.0,
        retire_spending_ratio: 0.8,
        child_cost_per_year: 1_000_000.0,
        mortgage_annual: 0.0,
        mortgage_until_age: None,
    };
    Preset::default().apply(&mut inputs);
    inputs
}
