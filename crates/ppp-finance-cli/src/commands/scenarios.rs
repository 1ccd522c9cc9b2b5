use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use ppp_finance_core::config::StressKind;
use ppp_finance_core::parameters::{self, ParameterField};
use ppp_finance_core::scenario::BASE_CASE;
use ppp_finance_core::sensitivity::sweep_values;
use ppp_finance_core::{sweep, SweepInput, SweepMode};

use crate::input::{self, ProjectRequest};

/// Arguments for a single-variable sensitivity
#[derive(Args)]
pub struct SensitivityArgs {
    /// Variable to sweep in format name:min:max:step
    /// (e.g. "discount_rate:0.05:0.30:0.05")
    #[arg(long, conflicts_with = "variable")]
    pub var: Option<String>,

    /// Variable to sweep, using --values or its typical range
    #[arg(long)]
    pub variable: Option<String>,

    /// Comma-separated values for --variable
    #[arg(long, requires = "variable", allow_hyphen_values = true)]
    pub values: Option<String>,

    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Arguments for a scenario comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Comma-separated scenario names (default: every configured scenario)
    #[arg(long)]
    pub scenarios: Option<String>,

    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Arguments for a stress test
#[derive(Args)]
pub struct StressArgs {
    /// Driver to shock
    #[arg(long)]
    pub kind: StressDriver,

    /// Comma-separated relative shocks (default: the configured grid)
    #[arg(long, allow_hyphen_values = true)]
    pub shocks: Option<String>,

    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Project inputs shared by every sweep
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON input file (parameters, or {parameters, scenario, config})
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON engine config
    #[arg(long)]
    pub config: Option<String>,

    /// Scenario held fixed while sweeping
    #[arg(long)]
    pub scenario: Option<String>,

    /// Override one base parameter, e.g. --set tax_rate=0.25 (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub overrides: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StressDriver {
    Revenue,
    Opex,
    DebtRate,
}

impl From<StressDriver> for StressKind {
    fn from(driver: StressDriver) -> Self {
        match driver {
            StressDriver::Revenue => StressKind::Revenue,
            StressDriver::Opex => StressKind::Opex,
            StressDriver::DebtRate => StressKind::DebtRate,
        }
    }
}

struct SweepVar {
    field: ParameterField,
    min: Decimal,
    max: Decimal,
    step: Decimal,
}

fn parse_sweep_var(raw: &str) -> Result<SweepVar, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            raw
        )
        .into());
    }
    Ok(SweepVar {
        field: parts[0].parse()?,
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    })
}

/// Resolve the swept field and its values from whichever flags were given.
fn sensitivity_points(
    args: &SensitivityArgs,
) -> Result<(ParameterField, Vec<Decimal>), Box<dyn std::error::Error>> {
    if let Some(ref raw) = args.var {
        let var = parse_sweep_var(raw)?;
        return Ok((var.field, sweep_values(var.min, var.max, var.step)?));
    }

    let Some(ref name) = args.variable else {
        return Err("--var name:min:max:step or --variable <name> required".into());
    };
    let field: ParameterField = name.parse()?;

    let values = match args.values {
        Some(ref list) => input::parse_decimal_list(list)?,
        None => {
            let range = parameters::parameter_range(field).ok_or_else(|| {
                format!("No typical range for {}; pass --values", field)
            })?;
            sweep_values(range.min, range.max, range.step)?
        }
    };
    Ok((field, values))
}

fn run_sweep(
    project: ProjectArgs,
    mode: impl FnOnce(&ProjectRequest) -> SweepMode,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = input::load_project(
        project.input.as_deref(),
        project.config.as_deref(),
        &project.overrides,
    )?;

    let sweep_input = SweepInput {
        sweep: mode(&request),
        scenario: project
            .scenario
            .or(request.scenario)
            .unwrap_or_else(|| BASE_CASE.to_string()),
        parameters: request.parameters,
        config: request.config,
    };

    let result = sweep(&sweep_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (variable, values) = sensitivity_points(&args)?;
    run_sweep(args.project, |_| SweepMode::Sensitivity { variable, values })
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let requested: Option<Vec<String>> = args.scenarios.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    });

    run_sweep(args.project, |request| SweepMode::ScenarioComparison {
        scenarios: requested
            .unwrap_or_else(|| request.config.scenarios.names().map(String::from).collect()),
    })
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let shocks = args
        .shocks
        .as_deref()
        .map(input::parse_decimal_list)
        .transpose()?;
    let kind = StressKind::from(args.kind);
    run_sweep(args.project, |_| SweepMode::StressTest { kind, shocks })
}
