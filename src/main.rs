use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{error, warn};

use lifeplan::api::{export, run_http_server, share};
use lifeplan::core::{
    Assumptions, InputError, Preset, SimulationReport, SimulatorInputs, StochasticOptions,
    check_ranges, default_inputs, run_simulation, validate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPreset {
    Conservative,
    Base,
    Aggressive,
}

impl From<CliPreset> for Preset {
    fn from(value: CliPreset) -> Self {
        match value {
            CliPreset::Conservative => Preset::Conservative,
            CliPreset::Base => Preset::Base,
            CliPreset::Aggressive => Preset::Aggressive,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum CliFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "lifeplan",
    about = "Household pension and life-event projector with Monte Carlo risk bands"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "warn",
        help = "Log level used when RUST_LOG is unset"
    )]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Project the household timeline and print indicators")]
    Project {
        #[arg(long, help = "JSON household document; defaults when omitted")]
        input: Option<PathBuf>,
        #[arg(long, value_enum)]
        preset: Option<CliPreset>,
        #[arg(long)]
        stochastic: bool,
        #[arg(long, help = "Monte Carlo paths (defaults to 500)")]
        iterations: Option<u32>,
        #[arg(long, default_value_t = lifeplan::core::DEFAULT_SEED)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = CliFormat::Table)]
        format: CliFormat,
    },
    #[command(about = "Print advisory warnings for an input document")]
    Validate {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    #[command(about = "Encode or decode share tokens")]
    Share {
        #[command(subcommand)]
        action: ShareAction,
    },
    #[command(about = "Serve the JSON API")]
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Subcommand, Debug)]
enum ShareAction {
    Encode {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    Decode {
        token: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("could not serialize output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = lifeplan::logging::init(&cli.log_level) {
        eprintln!("logging disabled: {err}");
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Project {
            input,
            preset,
            stochastic,
            iterations,
            seed,
            format,
        } => {
            let mut inputs = load_inputs(input.as_deref())?;
            if let Some(preset) = preset {
                Preset::from(preset).apply(&mut inputs);
            }
            check_ranges(&inputs)?;

            let options = stochastic.then(|| StochasticOptions {
                iterations: iterations
                    .unwrap_or(Assumptions::default().monte_carlo_iterations),
                seed,
            });
            let report = run_simulation(&inputs, options);
            for warning in &report.warnings {
                warn!(field = warning.field, "{}", warning.message);
            }

            match format {
                CliFormat::Table => print_table(&report),
                CliFormat::Csv => println!("{}", export::to_csv(&report.timeline)),
                CliFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
            Ok(())
        }
        Command::Validate { input } => {
            let inputs = load_inputs(input.as_deref())?;
            let report = validate(&inputs);
            if report.is_valid {
                println!("inputs look fine");
            }
            for warning in &report.warnings {
                warn!(field = warning.field, "{}", warning.message);
                println!("warning: {warning}");
            }
            Ok(())
        }
        Command::Share { action } => {
            match action {
                ShareAction::Encode { input } => {
                    let inputs = load_inputs(input.as_deref())?;
                    println!("{}", share::encode(&inputs));
                }
                ShareAction::Decode { token } => match share::decode(&token) {
                    Some(inputs) => println!("{}", serde_json::to_string_pretty(&inputs)?),
                    None => println!("nothing to load"),
                },
            }
            Ok(())
        }
        Command::Serve { port } => run_http_server(port).await.map_err(CliError::Server),
    }
}

fn load_inputs(path: Option<&Path>) -> Result<SimulatorInputs, InputError> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(default_inputs()),
    }
}

fn print_table(report: &SimulationReport) {
    println!(
        "{:>6} {:>4} {:>4} {:>14} {:>14} {:>14} {:>14} {:>14} {:>16}",
        "year", "age", "sp", "income", "pensions", "annuity", "outflows", "net", "balance"
    );
    for row in &report.timeline {
        let spouse_age = row
            .age_spouse
            .map_or_else(|| "-".to_string(), |age| age.to_string());
        let flags = match (row.is_primary_deceased, row.is_retired) {
            (true, _) => " deceased",
            (false, true) => " retired",
            (false, false) => "",
        };
        println!(
            "{:>6} {:>4} {:>4} {:>14.0} {:>14.0} {:>14.0} {:>14.0} {:>14.0} {:>16.0}{}",
            row.year,
            row.age_primary,
            spouse_age,
            row.income,
            row.pensions_public + row.pensions_public_spouse,
            row.annuities_private,
            row.spending + row.child_cost + row.mortgage,
            row.net_cash_flow,
            row.end_balance,
            flags
        );
    }

    let kpis = &report.kpis;
    println!();
    println!("lifetime receipts:      {:>16.0}", kpis.lifetime_receipts);
    println!("  public:               {:>16.0}", kpis.lifetime_receipts_public);
    println!("  private:              {:>16.0}", kpis.lifetime_receipts_private);
    println!("retirement balance:     {:>16.0}", kpis.retirement_balance);
    println!("retirement gap (nom.):  {:>16.0}", kpis.retirement_gap_nominal);
    println!("retirement gap (real):  {:>16.0}", kpis.retirement_gap_real);
    println!("peak balance:           {:>16.0}", kpis.peak_balance);
    println!("final balance:          {:>16.0}", kpis.final_balance);

    if let Some(mc) = &report.monte_carlo {
        let last = mc.percentiles.len().checked_sub(1);
        println!(
            "ruin probability:       {:>15.1}% ({} of {} paths)",
            mc.ruin_probability * 100.0,
            mc.ruined_paths,
            mc.paths.len()
        );
        if let Some(last) = last {
            println!(
                "final balance p10/p50/p90: {:.0} / {:.0} / {:.0}",
                mc.percentiles.p10[last], mc.percentiles.p50[last], mc.percentiles.p90[last]
            );
        }
    }
}
