use super::assumptions::Assumptions;
use super::types::{KpiResults, SimulatorInputs, TimelineRow};

pub fn summarize(
    timeline: &[TimelineRow],
    inputs: &SimulatorInputs,
    ruin_probability: Option<f64>,
) -> KpiResults {
    summarize_with(timeline, inputs, ruin_probability, &Assumptions::default())
}

// Reduces a timeline to headline indicators. `ruin_probability` is passed
// through untouched; it only exists when a stochastic run was made.
pub fn summarize_with(
    timeline: &[TimelineRow],
    inputs: &SimulatorInputs,
    ruin_probability: Option<f64>,
    assumptions: &Assumptions,
) -> KpiResults {
    let lifetime_receipts_public: f64 = timeline
        .iter()
        .map(|row| row.pensions_public + row.pensions_public_spouse)
        .sum();
    let lifetime_receipts_private: f64 = timeline.iter().map(|row| row.annuities_private).sum();

    let retirement_balance = timeline
        .iter()
        .find(|row| row.age_primary == inputs.retire_age)
        .map_or(0.0, |row| row.end_balance);

    let years_in_retirement = inputs
        .effective_primary_death_age(assumptions)
        .saturating_sub(inputs.retire_age);
    let annual_spending = inputs.retirement_spending();
    let annual_income = average_retirement_income(timeline, years_in_retirement);
    let years = f64::from(years_in_retirement);

    let retirement_gap_nominal =
        retirement_balance + annual_income * years - annual_spending * years;

    let rate = real_discount_rate(inputs, assumptions);
    let retirement_gap_real = (0..years_in_retirement).fold(retirement_balance, |gap, k| {
        gap + (annual_income - annual_spending) * (1.0 + rate).powf(-f64::from(k + 1))
    });

    KpiResults {
        lifetime_receipts: lifetime_receipts_public + lifetime_receipts_private,
        lifetime_receipts_public,
        lifetime_receipts_private,
        retirement_gap_nominal,
        retirement_gap_real,
        ruin_probability,
        final_balance: timeline.last().map_or(0.0, |row| row.end_balance),
        peak_balance: timeline
            .iter()
            .map(|row| row.end_balance)
            .reduce(f64::max)
            .unwrap_or(0.0),
        retirement_balance,
    }
}

pub fn real_discount_rate(inputs: &SimulatorInputs, assumptions: &Assumptions) -> f64 {
    (inputs.expected_return - inputs.inflation_rate).max(assumptions.min_discount_rate)
}

// Receipts over retired rows while the applicant is alive, spread over the
// nominal retirement length (at least one year).
fn average_retirement_income(timeline: &[TimelineRow], years_in_retirement: u32) -> f64 {
    let total: f64 = timeline
        .iter()
        .filter(|row| row.is_retired && !row.is_primary_deceased)
        .map(|row| row.pensions_public + row.pensions_public_spouse + row.annuities_private)
        .sum();
    total / f64::from(years_in_retirement.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assumptions::default_inputs;
    use crate::core::engine::project_with;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn row(
        age: u32,
        retired: bool,
        deceased: bool,
        pension: f64,
        annuity: f64,
        balance: f64,
    ) -> TimelineRow {
        TimelineRow {
            year: 2024 + (age as i32 - 64),
            age_primary: age,
            age_spouse: None,
            income: 0.0,
            pensions_public: pension,
            pensions_public_spouse: 0.0,
            annuities_private: annuity,
            spending: 0.0,
            child_cost: 0.0,
            mortgage: 0.0,
            net_cash_flow: 0.0,
            end_balance: balance,
            is_retired: retired,
            is_primary_deceased: deceased,
            is_spouse_deceased: false,
        }
    }

    fn oracle_inputs() -> SimulatorInputs {
        let mut inputs = default_inputs();
        inputs.retire_age = 65;
        inputs.death_age_primary = Some(67);
        inputs.current_annual_spending = 1_000.0;
        inputs.retire_spending_ratio = 0.8;
        inputs.expected_return = 0.03;
        inputs.inflation_rate = 0.015;
        inputs
    }

    fn oracle_timeline() -> Vec<TimelineRow> {
        vec![
            row(64, false, false, 0.0, 0.0, 100.0),
            row(65, true, false, 500.0, 100.0, 1_000.0),
            row(66, true, false, 500.0, 100.0, 900.0),
            row(67, true, true, 0.0, 0.0, 800.0),
        ]
    }

    #[test]
    fn oracle_two_year_retirement() {
        let kpis = summarize(&oracle_timeline(), &oracle_inputs(), None);

        assert_approx(kpis.lifetime_receipts_public, 1_000.0);
        assert_approx(kpis.lifetime_receipts_private, 200.0);
        assert_approx(kpis.lifetime_receipts, 1_200.0);
        assert_approx(kpis.retirement_balance, 1_000.0);
        assert_approx(kpis.final_balance, 800.0);
        assert_approx(kpis.peak_balance, 1_000.0);

        // income 1200 / 2 years = 600, spending 800 per year
        assert_approx(kpis.retirement_gap_nominal, 1_000.0 + 1_200.0 - 1_600.0);
        let expected_real = 1_000.0 - 200.0 / 1.015 - 200.0 / (1.015 * 1.015);
        assert_approx(kpis.retirement_gap_real, expected_real);
        assert_eq!(kpis.ruin_probability, None);
    }

    #[test]
    fn ruin_probability_passes_through() {
        let kpis = summarize(&oracle_timeline(), &oracle_inputs(), Some(0.25));
        assert_eq!(kpis.ruin_probability, Some(0.25));
    }

    #[test]
    fn discount_rate_has_a_floor() {
        let mut inputs = oracle_inputs();
        inputs.expected_return = 0.01;
        inputs.inflation_rate = 0.02;
        assert_approx(real_discount_rate(&inputs, &Assumptions::default()), 0.005);
        inputs.expected_return = 0.05;
        assert_approx(real_discount_rate(&inputs, &Assumptions::default()), 0.03);
    }

    #[test]
    fn missing_retirement_row_reads_zero() {
        let mut inputs = oracle_inputs();
        inputs.retire_age = 70;
        inputs.death_age_primary = Some(90);
        let kpis = summarize(&oracle_timeline(), &inputs, None);
        assert_eq!(kpis.retirement_balance, 0.0);
    }

    #[test]
    fn retirement_after_death_age_has_no_retirement_years() {
        let mut inputs = oracle_inputs();
        inputs.retire_age = 70;
        inputs.death_age_primary = Some(66);
        let kpis = summarize(&oracle_timeline(), &inputs, None);
        assert_eq!(kpis.retirement_gap_nominal, 0.0);
        assert_eq!(kpis.retirement_gap_real, 0.0);
    }

    #[test]
    fn empty_timeline_is_all_zero() {
        let kpis = summarize(&[], &oracle_inputs(), None);
        assert_eq!(kpis.lifetime_receipts, 0.0);
        assert_eq!(kpis.final_balance, 0.0);
        assert_eq!(kpis.peak_balance, 0.0);
        assert_eq!(kpis.retirement_balance, 0.0);
    }

    #[test]
    fn unset_death_age_uses_max_age_for_retirement_length() {
        let assumptions = Assumptions {
            start_year: Some(2024),
            ..Assumptions::default()
        };
        let inputs = default_inputs();
        let timeline = project_with(&inputs, &assumptions);
        let kpis = summarize_with(&timeline, &inputs, None, &assumptions);

        let retired_income: f64 = timeline
            .iter()
            .filter(|r| r.is_retired)
            .map(|r| r.pensions_public + r.pensions_public_spouse + r.annuities_private)
            .sum();
        // 100 - 65 = 35 years
        let expected = kpis.retirement_balance + retired_income / 35.0 * 35.0
            - inputs.retirement_spending() * 35.0;
        assert!((kpis.retirement_gap_nominal - expected).abs() < 1e-3);
        assert!(kpis.peak_balance >= kpis.final_balance);
    }
}
