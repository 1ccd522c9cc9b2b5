mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::projection::{CalculateArgs, DefaultsArgs};
use commands::scenarios::{CompareArgs, SensitivityArgs, StressArgs};

/// PPP project finance projections
#[derive(Parser)]
#[command(
    name = "ppp",
    version,
    about = "PPP project cashflow projections and KPIs",
    long_about = "Projects the year-by-year cashflows of a Public-Private Partnership \
                  investment with decimal precision and derives NPV, IRR, DSCR, payback \
                  and profitability index. Supports named scenarios, single-variable \
                  sensitivities and stress tests."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cashflow table and KPIs for one scenario
    Calculate(CalculateArgs),
    /// Sweep one parameter across a range of values
    Sensitivity(SensitivityArgs),
    /// Compare KPIs across named scenarios
    Compare(CompareArgs),
    /// Shock revenue, opex or debt rate across a grid
    Stress(StressArgs),
    /// Print the default parameter set
    Defaults(DefaultsArgs),
    /// Print the typical analyst range of each parameter
    Ranges,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::projection::run_calculate(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::Compare(args) => commands::scenarios::run_compare(args),
        Commands::Stress(args) => commands::scenarios::run_stress(args),
        Commands::Defaults(args) => commands::projection::run_defaults(args),
        Commands::Ranges => commands::projection::run_ranges(),
        Commands::Version => {
            println!("ppp {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
