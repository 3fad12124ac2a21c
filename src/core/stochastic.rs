use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use super::assumptions::Assumptions;
use super::engine::floor_at_zero;
use super::error::SimulationError;
use super::events::{HouseholdState, roll_balance, step_year};
use super::percentiles::percentile_bands;
use super::types::{MonteCarloResults, SimulatorInputs};

pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StochasticOptions {
    pub iterations: u32,
    pub seed: u64,
}

impl StochasticOptions {
    pub fn from_assumptions(assumptions: &Assumptions) -> Self {
        Self {
            iterations: assumptions.monte_carlo_iterations,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct PathOutcome {
    balances: Vec<f64>,
    ruined: bool,
}

pub fn project_stochastic(inputs: &SimulatorInputs, iterations: u32) -> MonteCarloResults {
    project_stochastic_with(
        inputs,
        &Assumptions::default(),
        StochasticOptions {
            iterations,
            seed: DEFAULT_SEED,
        },
    )
}

pub fn project_stochastic_with(
    inputs: &SimulatorInputs,
    assumptions: &Assumptions,
    options: StochasticOptions,
) -> MonteCarloResults {
    let token = CancelToken::new();
    match project_stochastic_cancellable(inputs, assumptions, options, &token) {
        Ok(results) => results,
        Err(err) => unreachable!("a private cancel token was triggered: {err}"),
    }
}

pub fn project_stochastic_cancellable(
    inputs: &SimulatorInputs,
    assumptions: &Assumptions,
    options: StochasticOptions,
    cancel: &CancelToken,
) -> Result<MonteCarloResults, SimulationError> {
    let seed = options.seed;
    project_stochastic_with_rng(
        inputs,
        assumptions,
        options.iterations,
        |path| ChaCha8Rng::seed_from_u64(derive_seed(seed, path)),
        cancel,
    )
}

// Runs `iterations` paths, each drawing its returns from the generator `make_rng`
// builds for that path index. Paths are stacked in index order.
pub fn project_stochastic_with_rng<R, F>(
    inputs: &SimulatorInputs,
    assumptions: &Assumptions,
    iterations: u32,
    make_rng: F,
    cancel: &CancelToken,
) -> Result<MonteCarloResults, SimulationError>
where
    R: Rng,
    F: Fn(u64) -> R + Sync,
{
    let started = Instant::now();
    let years = inputs.projection_years(assumptions) as usize;
    let requested = iterations as usize;
    let finished = AtomicUsize::new(0);

    let run_path = |path: u32| -> Result<PathOutcome, SimulationError> {
        if cancel.is_cancelled() {
            return Err(SimulationError::Cancelled {
                completed: finished.load(Ordering::Relaxed),
                requested,
            });
        }
        let mut rng = make_rng(u64::from(path));
        let outcome = simulate_path(inputs, assumptions, &mut rng);
        finished.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    };

    #[cfg(feature = "parallel")]
    let outcomes: Result<Vec<PathOutcome>, SimulationError> =
        (0..iterations).into_par_iter().map(run_path).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Result<Vec<PathOutcome>, SimulationError> =
        (0..iterations).map(run_path).collect();

    let outcomes = match outcomes {
        Ok(outcomes) => outcomes,
        Err(err) => {
            warn!(%err, "monte carlo run aborted");
            return Err(err);
        }
    };

    let ruined_paths = outcomes.iter().filter(|outcome| outcome.ruined).count();
    let paths: Vec<Vec<f64>> = outcomes.into_iter().map(|o| o.balances).collect();
    let final_balances = paths
        .iter()
        .map(|path| path.last().copied().unwrap_or(0.0))
        .collect();
    let percentiles = percentile_bands(&paths, requested, years);
    let ruin_probability = if requested == 0 {
        0.0
    } else {
        ruined_paths as f64 / requested as f64
    };

    info!(
        iterations,
        years,
        ruined_paths,
        ruin_probability,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "monte carlo run complete"
    );

    Ok(MonteCarloResults {
        paths,
        final_balances,
        percentiles,
        ruined_paths,
        ruin_probability,
    })
}

fn simulate_path<R: Rng + ?Sized>(
    inputs: &SimulatorInputs,
    assumptions: &Assumptions,
    rng: &mut R,
) -> PathOutcome {
    let years = inputs.projection_years(assumptions);
    let sd = inputs.volatility / 100.0;

    let mut balances = Vec::with_capacity(years as usize);
    let mut state = HouseholdState::default();
    let mut balance = inputs.savings_now;
    let mut ruined = false;

    for index in 0..years {
        let step = step_year(inputs, assumptions, index, &mut state);
        let annual_return = sample_normal_return(rng, inputs.expected_return, sd);
        balance = roll_balance(balance, &step.flows, annual_return);
        if balance < 0.0 {
            ruined = true;
        }
        balance = floor_at_zero(balance);
        balances.push(balance);
    }

    PathOutcome { balances, ruined }
}

// Box-Muller draw from N(`mean`, `sd`), consuming exactly two uniforms.
pub fn sample_normal_return<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    z * sd + mean
}

pub fn derive_seed(base_seed: u64, path: u64) -> u64 {
    splitmix64(base_seed ^ path.rotate_left(32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assumptions::default_inputs;
    use crate::core::engine::project_with;
    use crate::core::types::Spouse;
    use proptest::prelude::{any, prop_assert, proptest};
    use rand::RngCore;

    // Always yields zero bits, which maps every Box-Muller draw to the mean.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn fixed_year() -> Assumptions {
        Assumptions {
            start_year: Some(2024),
            ..Assumptions::default()
        }
    }

    fn base_inputs() -> SimulatorInputs {
        let mut inputs = default_inputs();
        inputs.death_age_primary = Some(95);
        inputs
    }

    fn options(iterations: u32, seed: u64) -> StochasticOptions {
        StochasticOptions { iterations, seed }
    }

    #[test]
    fn same_seed_reproduces_matrix() {
        let inputs = base_inputs();
        let a = project_stochastic_with(&inputs, &fixed_year(), options(64, 7));
        let b = project_stochastic_with(&inputs, &fixed_year(), options(64, 7));
        assert_eq!(a.paths, b.paths);
        assert_eq!(a.ruin_probability, b.ruin_probability);

        let c = project_stochastic_with(&inputs, &fixed_year(), options(64, 8));
        assert_ne!(a.paths, c.paths);
    }

    #[test]
    fn matrix_shape_matches_timeline() {
        let inputs = base_inputs();
        let results = project_stochastic_with(&inputs, &fixed_year(), options(20, 1));
        let timeline = project_with(&inputs, &fixed_year());
        assert_eq!(results.paths.len(), 20);
        assert_eq!(results.final_balances.len(), 20);
        for (path, last) in results.paths.iter().zip(&results.final_balances) {
            assert_eq!(path.len(), timeline.len());
            assert_eq!(path.last().copied(), Some(*last));
        }
        assert_eq!(results.percentiles.len(), timeline.len());
    }

    #[test]
    fn zero_volatility_paths_match_deterministic_timeline() {
        let mut inputs = base_inputs();
        inputs.volatility = 0.0;
        inputs.spouse = Spouse {
            has_spouse: true,
            age: Some(45),
            gender: None,
        };
        inputs.death_age_primary = Some(70);
        inputs.children_ages = vec![3];
        inputs.mortgage_annual = 900_000.0;

        let timeline = project_with(&inputs, &fixed_year());
        let results = project_stochastic_with(&inputs, &fixed_year(), options(5, 3));
        for path in &results.paths {
            for (row, balance) in timeline.iter().zip(path) {
                assert_eq!(row.end_balance, *balance);
            }
        }
    }

    #[test]
    fn shortfall_marks_every_path_ruined() {
        let mut inputs = base_inputs();
        inputs.savings_now = 0.0;
        inputs.current_gross_income = 0.0;
        inputs.annual_private_saving = 0.0;
        let results = project_stochastic_with(&inputs, &fixed_year(), options(10, 5));
        assert_eq!(results.ruined_paths, 10);
        assert_eq!(results.ruin_probability, 1.0);
        assert!(results.paths.iter().flatten().all(|b| *b >= 0.0));
    }

    #[test]
    fn zero_iterations_yield_zero_bands() {
        let inputs = base_inputs();
        let results = project_stochastic_with(&inputs, &fixed_year(), options(0, 5));
        assert!(results.paths.is_empty());
        assert!(results.final_balances.is_empty());
        assert_eq!(results.ruin_probability, 0.0);
        assert_eq!(results.percentiles.len(), 56);
        assert!(results.percentiles.p90.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn cancelled_token_aborts_run() {
        let token = CancelToken::new();
        token.cancel();
        let err = project_stochastic_cancellable(&base_inputs(), &fixed_year(), options(50, 1), &token)
            .expect_err("run should be cancelled");
        assert!(matches!(err, SimulationError::Cancelled { requested: 50, .. }));
    }

    #[test]
    fn cancelling_mid_run_stops_remaining_paths() {
        let token = CancelToken::new();
        let make_rng = |path: u64| {
            if path == 50 {
                token.cancel();
            }
            ChaCha8Rng::seed_from_u64(derive_seed(DEFAULT_SEED, path))
        };
        let err = project_stochastic_with_rng(&base_inputs(), &fixed_year(), 200, make_rng, &token)
            .expect_err("run should be cancelled");
        match err {
            SimulationError::Cancelled {
                completed,
                requested,
            } => {
                assert_eq!(requested, 200);
                assert!(completed < 200);
            }
        }
        assert!(token.is_cancelled());
    }

    #[test]
    fn injected_generator_drives_returns() {
        let mut inputs = base_inputs();
        inputs.volatility = 25.0;
        let results = project_stochastic_with_rng(
            &inputs,
            &fixed_year(),
            3,
            |_| ZeroRng,
            &CancelToken::new(),
        )
        .expect("not cancelled");
        let timeline = project_with(&inputs, &fixed_year());
        let expected: Vec<f64> = timeline.iter().map(|row| row.end_balance).collect();
        for path in &results.paths {
            assert_eq!(path, &expected);
        }
    }

    #[test]
    fn box_muller_sample_mean_tracks_expected_return() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let n = 20_000;
        let mean = (0..n)
            .map(|_| sample_normal_return(&mut rng, 0.03, 0.1))
            .sum::<f64>()
            / n as f64;
        assert!((mean - 0.03).abs() < 0.005, "sample mean {mean}");
    }

    #[test]
    fn derive_seed_changes_per_path() {
        let a = derive_seed(42, 0);
        let b = derive_seed(42, 1);
        let c = derive_seed(43, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(16))]

        #[test]
        fn prop_percentiles_ordered_and_ruin_bounded(
            seed in any::<u64>(),
            iterations in 1u32..40,
            vol in 0u32..30,
            spending in 1_000_000u32..9_000_000
        ) {
            let mut inputs = base_inputs();
            inputs.volatility = vol as f64;
            inputs.current_annual_spending = spending as f64;
            let results = project_stochastic_with(&inputs, &fixed_year(), options(iterations, seed));

            prop_assert!((0.0..=1.0).contains(&results.ruin_probability));
            let bands = &results.percentiles;
            for year in 0..bands.len() {
                prop_assert!(bands.p10[year] <= bands.p25[year]);
                prop_assert!(bands.p25[year] <= bands.p50[year]);
                prop_assert!(bands.p50[year] <= bands.p75[year]);
                prop_assert!(bands.p75[year] <= bands.p90[year]);
            }
        }
    }
}
