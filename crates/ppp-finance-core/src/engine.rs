use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::benchmarks::{self, BenchmarkAssessment};
use crate::cashflow::{self, CashflowTable};
use crate::config::{EngineConfig, StressKind};
use crate::kpi::{self, KpiSummary};
use crate::parameters::{ParameterField, ParameterSet};
use crate::scenario::{ScenarioAdjustment, BASE_CASE};
use crate::sensitivity::{self, ScenarioComparison, SensitivityTable, StressTable};
use crate::types::{with_metadata, ComputationOutput};
use crate::PppFinanceResult;

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One pass of the pipeline: adjust, build, aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub adjusted_parameters: ParameterSet,
    pub cashflow_table: CashflowTable,
    pub kpis: KpiSummary,
}

/// Evaluate `params` under the named scenario from `config`.
pub fn evaluate(
    params: &ParameterSet,
    scenario: &str,
    config: &EngineConfig,
) -> PppFinanceResult<Evaluation> {
    let adjustment = config.scenarios.resolve(scenario);
    evaluate_adjusted(params, &adjustment, config)
}

/// Evaluate `params` under an explicit adjustment.
pub fn evaluate_adjusted(
    params: &ParameterSet,
    adjustment: &ScenarioAdjustment,
    config: &EngineConfig,
) -> PppFinanceResult<Evaluation> {
    params.validate()?;

    let adjusted_parameters = adjustment.apply(params);
    let cashflow_table = cashflow::build_with_rule(&adjusted_parameters, config.carryforward)?;
    let kpis = kpi::aggregate(&adjusted_parameters, &cashflow_table)?;

    Ok(Evaluation {
        adjusted_parameters,
        cashflow_table,
        kpis,
    })
}

// ---------------------------------------------------------------------------
// calculate
// ---------------------------------------------------------------------------

fn default_scenario() -> String {
    BASE_CASE.to_string()
}

/// Request for a single projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationInput {
    pub parameters: ParameterSet,
    #[serde(default = "default_scenario")]
    pub scenario: String,
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationOutput {
    pub scenario: String,
    /// False when the scenario name was unknown and Base Case was used
    pub scenario_recognised: bool,
    pub adjusted_parameters: ParameterSet,
    pub kpis: KpiSummary,
    pub benchmarks: BenchmarkAssessment,
    pub cashflow_table: CashflowTable,
}

/// Project the cashflows of a PPP investment and derive its KPIs.
///
/// The scenario adjustment is applied to the parameters, the year-by-year
/// table is built (revenue through DSCR, with loss carryforward), and NPV,
/// IRR, DSCR statistics, payback and profitability index are aggregated and
/// checked against the configured benchmarks.
pub fn calculate(input: &CalculationInput) -> PppFinanceResult<ComputationOutput<CalculationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.parameters.validate()?;
    warnings.extend(input.parameters.warnings());

    let scenario_recognised = input.config.scenarios.contains(&input.scenario);
    if !scenario_recognised {
        warnings.push(format!(
            "Unknown scenario '{}'; Base Case adjustments applied",
            input.scenario
        ));
    }

    let evaluation = evaluate(&input.parameters, &input.scenario, &input.config)?;
    let assessment = benchmarks::assess(
        &evaluation.cashflow_table,
        &evaluation.kpis,
        &input.config.benchmarks,
    );

    if evaluation.kpis.project_irr.is_none() {
        warnings.push("Project IRR did not converge; reported as unavailable".into());
    }
    if evaluation.kpis.min_dscr.is_none() {
        warnings.push("No year carries debt service; DSCR statistics are undefined".into());
    }
    warnings.extend(assessment.findings(&input.config.benchmarks));

    tracing::debug!(
        scenario = %input.scenario,
        npv = %evaluation.kpis.project_npv,
        warnings = warnings.len(),
        "calculation complete"
    );

    let output = CalculationOutput {
        scenario: input.scenario.clone(),
        scenario_recognised,
        adjusted_parameters: evaluation.adjusted_parameters,
        kpis: evaluation.kpis,
        benchmarks: assessment,
        cashflow_table: evaluation.cashflow_table,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "PPP project cashflow with straight-line debt amortisation and loss carryforward",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// sweep
// ---------------------------------------------------------------------------

/// What to sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SweepMode {
    /// Override one parameter with each value in turn
    Sensitivity {
        variable: ParameterField,
        values: Vec<Decimal>,
    },
    /// Evaluate each named scenario
    ScenarioComparison { scenarios: Vec<String> },
    /// Shock one driver; `shocks` defaults to the configured grid
    StressTest {
        kind: StressKind,
        #[serde(default)]
        shocks: Option<Vec<Decimal>>,
    },
}

/// Request for a comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepInput {
    pub parameters: ParameterSet,
    /// Scenario held fixed for sensitivity and stress sweeps
    #[serde(default = "default_scenario")]
    pub scenario: String,
    pub sweep: SweepMode,
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SweepOutput {
    Sensitivity(SensitivityTable),
    ScenarioComparison(ScenarioComparison),
    StressTest(StressTable),
}

/// Run a sensitivity sweep, scenario comparison or stress test.
pub fn sweep(input: &SweepInput) -> PppFinanceResult<ComputationOutput<SweepOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.parameters.validate()?;
    warnings.extend(input.parameters.warnings());

    let fixed_scenario = !matches!(input.sweep, SweepMode::ScenarioComparison { .. });
    if fixed_scenario && !input.config.scenarios.contains(&input.scenario) {
        warnings.push(format!(
            "Unknown scenario '{}'; Base Case adjustments applied",
            input.scenario
        ));
    }

    let (methodology, output) = match &input.sweep {
        SweepMode::Sensitivity { variable, values } => {
            let table = sensitivity::sensitivity(
                &input.parameters,
                &input.scenario,
                *variable,
                values,
                &input.config,
            )?;
            ("Single-variable sensitivity", SweepOutput::Sensitivity(table))
        }
        SweepMode::ScenarioComparison { scenarios } => {
            for name in scenarios {
                if !input.config.scenarios.contains(name) {
                    warnings.push(format!(
                        "Unknown scenario '{name}'; Base Case adjustments applied"
                    ));
                }
            }
            let comparison =
                sensitivity::scenario_compare(&input.parameters, scenarios, &input.config)?;
            (
                "Named scenario comparison",
                SweepOutput::ScenarioComparison(comparison),
            )
        }
        SweepMode::StressTest { kind, shocks } => {
            let shocks = shocks
                .as_deref()
                .unwrap_or_else(|| input.config.stress_tests.shocks(*kind));
            let table = sensitivity::stress_test(
                &input.parameters,
                &input.scenario,
                *kind,
                shocks,
                &input.config,
            )?;
            ("Stress test", SweepOutput::StressTest(table))
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    tracing::debug!(methodology, elapsed_us = elapsed, "sweep complete");

    Ok(with_metadata(methodology, input, warnings, elapsed, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{DOWNSIDE, UPSIDE};
    use rust_decimal_macros::dec;

    fn reference_input(scenario: &str) -> CalculationInput {
        CalculationInput {
            parameters: ParameterSet::default(),
            scenario: scenario.to_string(),
            config: EngineConfig::default(),
        }
    }

    #[test]
    fn test_calculate_reference_case() {
        let out = calculate(&reference_input(BASE_CASE)).unwrap();
        let result = &out.result;

        assert!(result.scenario_recognised);
        assert_eq!(result.cashflow_table.len(), 25);
        assert_eq!(result.adjusted_parameters, ParameterSet::default());
        assert_eq!(result.cashflow_table.rows[0].cfads, dec!(623));
        assert!(out.methodology.contains("loss carryforward"));
    }

    #[test]
    fn test_calculate_unknown_scenario_warns() {
        let out = calculate(&reference_input("Meteor")).unwrap();
        assert!(!out.result.scenario_recognised);
        assert_eq!(out.result.adjusted_parameters, ParameterSet::default());
        assert!(out.warnings.iter().any(|w| w.contains("Unknown scenario")));
    }

    #[test]
    fn test_calculate_rejects_invalid_parameters() {
        let mut input = reference_input(BASE_CASE);
        input.parameters.depreciation_period = 0;
        assert!(calculate(&input).is_err());
    }

    #[test]
    fn test_calculate_input_defaults_from_json() {
        let input: CalculationInput =
            serde_json::from_value(serde_json::json!({
                "parameters": serde_json::to_value(ParameterSet::default()).unwrap()
            }))
            .unwrap();
        assert_eq!(input.scenario, BASE_CASE);
        assert_eq!(input.config, EngineConfig::default());
    }

    #[test]
    fn test_sweep_sensitivity_mode() {
        let input: SweepInput = serde_json::from_value(serde_json::json!({
            "parameters": serde_json::to_value(ParameterSet::default()).unwrap(),
            "sweep": {
                "mode": "sensitivity",
                "variable": "debt_rate",
                "values": ["0.06", "0.09", "0.12"]
            }
        }))
        .unwrap();

        let out = sweep(&input).unwrap();
        match out.result {
            SweepOutput::Sensitivity(table) => {
                assert_eq!(table.variable, ParameterField::DebtRate);
                assert_eq!(table.rows.len(), 3);
            }
            other => panic!("unexpected sweep output: {other:?}"),
        }
    }

    #[test]
    fn test_sweep_stress_uses_configured_grid() {
        let input = SweepInput {
            parameters: ParameterSet::default(),
            scenario: BASE_CASE.into(),
            sweep: SweepMode::StressTest {
                kind: StressKind::Opex,
                shocks: None,
            },
            config: EngineConfig::default(),
        };

        let out = sweep(&input).unwrap();
        match out.result {
            SweepOutput::StressTest(table) => {
                assert_eq!(table.rows.len(), 5);
                assert_eq!(table.rows[0].shock, dec!(-0.10));
            }
            other => panic!("unexpected sweep output: {other:?}"),
        }
    }

    #[test]
    fn test_sweep_warns_when_fixed_scenario_unknown() {
        let modes = [
            SweepMode::Sensitivity {
                variable: ParameterField::DiscountRate,
                values: vec![dec!(0.12)],
            },
            SweepMode::StressTest {
                kind: StressKind::Revenue,
                shocks: Some(vec![dec!(-0.1)]),
            },
        ];
        for mode in modes {
            let input = SweepInput {
                parameters: ParameterSet::default(),
                scenario: "Meteor".into(),
                sweep: mode,
                config: EngineConfig::default(),
            };
            let out = sweep(&input).unwrap();
            assert!(out.warnings.iter().any(|w| w.contains("Meteor")));
        }

        let known = SweepInput {
            parameters: ParameterSet::default(),
            scenario: DOWNSIDE.into(),
            sweep: SweepMode::Sensitivity {
                variable: ParameterField::DiscountRate,
                values: vec![dec!(0.12)],
            },
            config: EngineConfig::default(),
        };
        let out = sweep(&known).unwrap();
        assert!(!out.warnings.iter().any(|w| w.contains("Unknown scenario")));
    }

    #[test]
    fn test_sweep_scenario_comparison_ordering() {
        let input = SweepInput {
            parameters: ParameterSet::default(),
            scenario: BASE_CASE.into(),
            sweep: SweepMode::ScenarioComparison {
                scenarios: vec![BASE_CASE.into(), DOWNSIDE.into(), UPSIDE.into()],
            },
            config: EngineConfig::default(),
        };

        let out = sweep(&input).unwrap();
        let SweepOutput::ScenarioComparison(comparison) = out.result else {
            panic!("expected a scenario comparison");
        };
        assert_eq!(comparison.rows.len(), 3);
        let npv = |name: &str| comparison.get(name).unwrap().project_npv;
        assert!(npv(DOWNSIDE) <= npv(BASE_CASE));
        assert!(npv(BASE_CASE) <= npv(UPSIDE));
    }
}
