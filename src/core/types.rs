use std::fmt;

use serde::{Deserialize, Serialize};

use super::assumptions::Assumptions;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spouse {
    pub has_spouse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

impl Spouse {
    pub fn none() -> Self {
        Self {
            has_spouse: false,
            age: None,
            gender: None,
        }
    }
}

// Household description for one projection. Rates are fractions
// (`0.03` is 3 %) except `volatility`, which is a percentage (`10` is 10 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorInputs {
    pub applicant_age: u32,
    pub gender: Gender,
    pub spouse: Spouse,
    pub children_ages: Vec<u32>,

    pub retire_age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_age_primary: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_age_spouse: Option<u32>,

    pub current_gross_income: f64,
    pub salary_growth_rate: f64,
    pub savings_now: f64,
    pub annual_private_saving: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub inflation_rate: f64,

    pub basic_pension_full_amount: f64,
    pub basic_pension_coverage: f64,
    pub earnings_related_factor: f64,
    pub avg_standard_remuneration: f64,

    pub survivor_benefit_rate: f64,
    pub survivor_benefit_min_years: u32,

    pub private_annuity_start_age: u32,
    pub private_annuity_annual: f64,
    pub whole_life_death_benefit: f64,
    pub term_life_death_benefit: f64,

    pub current_annual_spending: f64,
    pub retire_spending_ratio: f64,
    pub child_cost_per_year: f64,
    pub mortgage_annual: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mortgage_until_age: Option<u32>,
}

impl SimulatorInputs {
    // Spouse age at year 0, only when a spouse is present and their age is known.
    pub fn spouse_age(&self) -> Option<u32> {
        if self.spouse.has_spouse {
            self.spouse.age
        } else {
            None
        }
    }

    pub fn effective_primary_death_age(&self, assumptions: &Assumptions) -> u32 {
        self.death_age_primary.unwrap_or(assumptions.max_age)
    }

    pub fn effective_spouse_death_age(&self, assumptions: &Assumptions) -> Option<u32> {
        self.spouse
            .has_spouse
            .then(|| self.death_age_spouse.unwrap_or(assumptions.max_age))
    }

    pub fn horizon_age(&self, assumptions: &Assumptions) -> u32 {
        self.effective_primary_death_age(assumptions)
            .max(self.effective_spouse_death_age(assumptions).unwrap_or(0))
    }

    pub fn projection_years(&self, assumptions: &Assumptions) -> u32 {
        let horizon = self.horizon_age(assumptions);
        if horizon < self.applicant_age {
            0
        } else {
            horizon - self.applicant_age + 1
        }
    }

    pub fn mortgage_end_age(&self) -> u32 {
        self.mortgage_until_age.unwrap_or(self.retire_age)
    }

    pub fn base_public_pension(&self) -> f64 {
        self.basic_pension_full_amount * self.basic_pension_coverage
    }

    pub fn earnings_related_pension(&self) -> f64 {
        self.earnings_related_factor * self.avg_standard_remuneration * 12.0
    }

    pub fn death_benefits(&self) -> f64 {
        self.whole_life_death_benefit + self.term_life_death_benefit
    }

    pub fn retirement_spending(&self) -> f64 {
        self.current_annual_spending * self.retire_spending_ratio
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub year: i32,
    pub age_primary: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_spouse: Option<u32>,
    pub income: f64,
    pub pensions_public: f64,
    pub pensions_public_spouse: f64,
    pub annuities_private: f64,
    pub spending: f64,
    pub child_cost: f64,
    pub mortgage: f64,
    pub net_cash_flow: f64,
    pub end_balance: f64,
    pub is_retired: bool,
    pub is_primary_deceased: bool,
    pub is_spouse_deceased: bool,
}

pub type Timeline = Vec<TimelineRow>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResults {
    pub lifetime_receipts: f64,
    pub lifetime_receipts_public: f64,
    pub lifetime_receipts_private: f64,
    pub retirement_gap_nominal: f64,
    pub retirement_gap_real: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruin_probability: Option<f64>,
    pub final_balance: f64,
    pub peak_balance: f64,
    pub retirement_balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PercentileBands {
    pub p10: Vec<f64>,
    pub p25: Vec<f64>,
    pub p50: Vec<f64>,
    pub p75: Vec<f64>,
    pub p90: Vec<f64>,
}

impl PercentileBands {
    pub fn with_capacity(years: usize) -> Self {
        Self {
            p10: Vec::with_capacity(years),
            p25: Vec::with_capacity(years),
            p50: Vec::with_capacity(years),
            p75: Vec::with_capacity(years),
            p90: Vec::with_capacity(years),
        }
    }

    pub fn len(&self) -> usize {
        self.p50.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p50.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResults {
    // Floored end-of-year balances, one row per path.
    pub paths: Vec<Vec<f64>>,
    pub final_balances: Vec<f64>,
    pub percentiles: PercentileBands,
    pub ruined_paths: usize,
    pub ruin_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn from_warnings(warnings: Vec<ValidationWarning>) -> Self {
        Self {
            is_valid: warnings.is_empty(),
            warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub timeline: Timeline,
    pub kpis: KpiResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloResults>,
    pub warnings: Vec<ValidationWarning>,
}
