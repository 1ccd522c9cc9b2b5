use clap::Args;
use serde_json::Value;

use ppp_finance_core::config::EngineConfig;
use ppp_finance_core::parameters;
use ppp_finance_core::scenario::BASE_CASE;
use ppp_finance_core::{calculate, CalculationInput, ParameterSet};

use crate::input;

/// Arguments for a single projection
#[derive(Args)]
pub struct CalculateArgs {
    /// Path to JSON input file (parameters, or {parameters, scenario, config})
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON engine config (scenarios, benchmarks, stress grids)
    #[arg(long)]
    pub config: Option<String>,

    /// Scenario to apply; overrides any scenario in the input file
    #[arg(long)]
    pub scenario: Option<String>,

    /// Override one parameter, e.g. --set debt_rate=0.08 (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub overrides: Vec<String>,

    /// Omit the year-by-year cashflow table
    #[arg(long)]
    pub kpis_only: bool,
}

/// Arguments for printing defaults
#[derive(Args)]
pub struct DefaultsArgs {
    /// Print the default engine config instead of the parameter set
    #[arg(long)]
    pub config: bool,
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = input::load_project(args.input.as_deref(), args.config.as_deref(), &args.overrides)?;

    let calc_input = CalculationInput {
        parameters: request.parameters,
        scenario: args
            .scenario
            .or(request.scenario)
            .unwrap_or_else(|| BASE_CASE.to_string()),
        config: request.config,
    };

    let result = calculate(&calc_input)?;
    let mut value = serde_json::to_value(result)?;

    if args.kpis_only {
        if let Some(Value::Object(res)) = value.get_mut("result") {
            res.remove("cashflow_table");
        }
    }

    Ok(value)
}

pub fn run_defaults(args: DefaultsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if args.config {
        Ok(serde_json::to_value(EngineConfig::default())?)
    } else {
        Ok(serde_json::to_value(ParameterSet::default())?)
    }
}

pub fn run_ranges() -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(parameters::parameter_ranges())?)
}
