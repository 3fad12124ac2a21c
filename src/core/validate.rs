use super::assumptions::Assumptions;
use super::error::InputError;
use super::types::{SimulatorInputs, ValidationReport, ValidationWarning};

const RATE_TOLERANCE: f64 = 1e-9;

// Ages and year counts past this would make the horizon loop run away.
pub const MAX_MODELLED_AGE: u32 = 150;

pub fn validate(inputs: &SimulatorInputs) -> ValidationReport {
    validate_with(inputs, &Assumptions::default())
}

// Advisory only. A report with warnings never stops a projection.
pub fn validate_with(inputs: &SimulatorInputs, assumptions: &Assumptions) -> ValidationReport {
    let mut warnings = Vec::new();

    if inputs.retire_age < inputs.applicant_age + assumptions.min_retire_age_gap {
        warnings.push(ValidationWarning {
            field: "retireAge",
            message: "retirement age is too close to the current age".to_string(),
        });
    }

    if inputs.basic_pension_coverage < assumptions.min_basic_pension_coverage {
        warnings.push(ValidationWarning {
            field: "basicPensionCoverage",
            message: format!(
                "basic pension coverage is below {}%",
                assumptions.min_basic_pension_coverage * 100.0
            ),
        });
    }

    let rate = inputs.survivor_benefit_rate;
    if rate > 0.0 && (rate - assumptions.conventional_survivor_benefit_rate).abs() > RATE_TOLERANCE
    {
        warnings.push(ValidationWarning {
            field: "survivorBenefitRate",
            message: "survivor benefit rate is a simplification and may differ from the actual scheme"
                .to_string(),
        });
    }

    if inputs.spouse.has_spouse && matches!(inputs.spouse.age, None | Some(0)) {
        warnings.push(ValidationWarning {
            field: "spouse.age",
            message: "spouse age is missing".to_string(),
        });
    }

    warnings.extend(range_warnings(inputs));
    ValidationReport::from_warnings(warnings)
}

pub fn range_warnings(inputs: &SimulatorInputs) -> Vec<ValidationWarning> {
    let mut checks: Vec<(&'static str, f64, f64, f64)> = vec![(
        "applicantAge",
        f64::from(inputs.applicant_age),
        20.0,
        80.0,
    )];
    if let Some(age) = inputs.spouse.age {
        checks.push(("spouse.age", f64::from(age), 20.0, 80.0));
    }
    checks.extend(
        inputs
            .children_ages
            .iter()
            .map(|age| ("childrenAges", f64::from(*age), 0.0, 22.0)),
    );
    checks.push(("retireAge", f64::from(inputs.retire_age), 55.0, 75.0));
    if let Some(age) = inputs.death_age_primary {
        checks.push(("deathAgePrimary", f64::from(age), 60.0, 110.0));
    }
    if let Some(age) = inputs.death_age_spouse {
        checks.push(("deathAgeSpouse", f64::from(age), 60.0, 110.0));
    }
    checks.extend([
        ("salaryGrowthRate", inputs.salary_growth_rate, -0.05, 0.10),
        ("expectedReturn", inputs.expected_return, -0.05, 0.15),
        ("volatility", inputs.volatility, 0.0, 30.0),
        ("inflationRate", inputs.inflation_rate, 0.0, 0.10),
        ("basicPensionCoverage", inputs.basic_pension_coverage, 0.0, 1.0),
        ("earningsRelatedFactor", inputs.earnings_related_factor, 0.0, 0.01),
        ("survivorBenefitRate", inputs.survivor_benefit_rate, 0.0, 1.0),
        (
            "survivorBenefitMinYears",
            f64::from(inputs.survivor_benefit_min_years),
            0.0,
            30.0,
        ),
        (
            "privateAnnuityStartAge",
            f64::from(inputs.private_annuity_start_age),
            55.0,
            80.0,
        ),
        ("retireSpendingRatio", inputs.retire_spending_ratio, 0.0, 2.0),
    ]);
    if let Some(age) = inputs.mortgage_until_age {
        checks.push(("mortgageUntilAge", f64::from(age), 30.0, 80.0));
    }

    checks
        .into_iter()
        // NaN fails both comparisons, so test for containment rather than violation
        .filter(|(_, value, min, max)| !(*min..=*max).contains(value))
        .map(|(field, value, min, max)| ValidationWarning {
            field,
            message: format!("{value} is outside the usual range {min} to {max}"),
        })
        .collect()
}

// Hard rejections at the CLI and HTTP boundary, limited to values the
// arithmetic cannot carry. The projectors never call this.
pub fn check_ranges(inputs: &SimulatorInputs) -> Result<(), InputError> {
    let mut ages = vec![
        ("applicantAge", inputs.applicant_age),
        ("retireAge", inputs.retire_age),
        ("survivorBenefitMinYears", inputs.survivor_benefit_min_years),
        ("privateAnnuityStartAge", inputs.private_annuity_start_age),
    ];
    ages.extend(inputs.spouse.age.map(|age| ("spouse.age", age)));
    ages.extend(inputs.children_ages.iter().map(|age| ("childrenAges", *age)));
    ages.extend(inputs.death_age_primary.map(|age| ("deathAgePrimary", age)));
    ages.extend(inputs.death_age_spouse.map(|age| ("deathAgeSpouse", age)));
    ages.extend(inputs.mortgage_until_age.map(|age| ("mortgageUntilAge", age)));
    for (field, age) in ages {
        if age > MAX_MODELLED_AGE {
            return Err(InputError::OutOfRange {
                field,
                min: 0.0,
                max: f64::from(MAX_MODELLED_AGE),
                value: f64::from(age),
            });
        }
    }

    let rates = [
        ("salaryGrowthRate", inputs.salary_growth_rate),
        ("expectedReturn", inputs.expected_return),
        ("volatility", inputs.volatility),
        ("inflationRate", inputs.inflation_rate),
        ("basicPensionCoverage", inputs.basic_pension_coverage),
        ("earningsRelatedFactor", inputs.earnings_related_factor),
        ("survivorBenefitRate", inputs.survivor_benefit_rate),
        ("retireSpendingRatio", inputs.retire_spending_ratio),
    ];
    for (field, value) in rates {
        if !value.is_finite() {
            return Err(InputError::NotFinite { field, value });
        }
    }

    let amounts = [
        ("currentGrossIncome", inputs.current_gross_income),
        ("savingsNow", inputs.savings_now),
        ("annualPrivateSaving", inputs.annual_private_saving),
        ("basicPensionFullAmount", inputs.basic_pension_full_amount),
        ("avgStandardRemuneration", inputs.avg_standard_remuneration),
        ("privateAnnuityAnnual", inputs.private_annuity_annual),
        ("wholeLifeDeathBenefit", inputs.whole_life_death_benefit),
        ("termLifeDeathBenefit", inputs.term_life_death_benefit),
        ("currentAnnualSpending", inputs.current_annual_spending),
        ("childCostPerYear", inputs.child_cost_per_year),
        ("mortgageAnnual", inputs.mortgage_annual),
    ];
    for (field, value) in amounts {
        if !value.is_finite() || value < 0.0 {
            return Err(InputError::InvalidAmount { field, value });
        }
    }

    Ok(())
}
