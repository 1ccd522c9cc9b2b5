//! Repeated evaluation of the engine across sweep points and scenarios.
//!
//! Every point is evaluated from its own copy of the parameters, so points
//! are independent. With the `parallel` feature they run on the rayon pool;
//! output order always matches input order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, StressKind};
use crate::engine;
use crate::error::PppFinanceError;
use crate::kpi::KpiSummary;
use crate::parameters::{ParameterField, ParameterSet};
use crate::scenario::ScenarioAdjustment;
use crate::PppFinanceResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// KPIs at one value of the swept parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub value: Decimal,
    #[serde(flatten)]
    pub kpis: KpiSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    pub variable: ParameterField,
    pub scenario: String,
    pub rows: Vec<SensitivityRow>,
}

/// KPIs for one named scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioKpis {
    pub scenario: String,
    /// Adjustment actually applied (Base Case for unknown names)
    pub adjustment: ScenarioAdjustment,
    #[serde(flatten)]
    pub kpis: KpiSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub rows: Vec<ScenarioKpis>,
}

impl ScenarioComparison {
    pub fn get(&self, scenario: &str) -> Option<&KpiSummary> {
        self.rows
            .iter()
            .find(|r| r.scenario == scenario)
            .map(|r| &r.kpis)
    }
}

/// KPIs at one shock level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRow {
    pub shock: Decimal,
    #[serde(flatten)]
    pub kpis: KpiSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTable {
    pub kind: StressKind,
    pub scenario: String,
    pub rows: Vec<StressRow>,
}

// ---------------------------------------------------------------------------
// Sweeps
// ---------------------------------------------------------------------------

/// Single-variable sensitivity.
///
/// For each value, `variable` is overridden on the base parameters and the
/// full pipeline runs under `scenario`. Each row equals a standalone
/// calculation at that value.
pub fn sensitivity(
    params: &ParameterSet,
    scenario: &str,
    variable: ParameterField,
    values: &[Decimal],
    config: &EngineConfig,
) -> PppFinanceResult<SensitivityTable> {
    if values.is_empty() {
        return Err(PppFinanceError::InsufficientData(format!(
            "Sensitivity on {variable} requires at least one value"
        )));
    }

    let rows = map_points(values, |&value| {
        let overridden = params.with_field(variable, value)?;
        let evaluation = engine::evaluate(&overridden, scenario, config)?;
        tracing::debug!(%variable, %value, npv = %evaluation.kpis.project_npv, "sensitivity point");
        Ok(SensitivityRow {
            value,
            kpis: evaluation.kpis,
        })
    })?;

    Ok(SensitivityTable {
        variable,
        scenario: scenario.to_string(),
        rows,
    })
}

/// Run the full pipeline once per named scenario.
///
/// Rows keep the requested order; a repeated name is evaluated once.
pub fn scenario_compare(
    params: &ParameterSet,
    scenarios: &[String],
    config: &EngineConfig,
) -> PppFinanceResult<ScenarioComparison> {
    if scenarios.is_empty() {
        return Err(PppFinanceError::InsufficientData(
            "At least one scenario required".into(),
        ));
    }

    let mut names: Vec<&String> = Vec::with_capacity(scenarios.len());
    for name in scenarios {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let rows = map_points(&names, |name| {
        let evaluation = engine::evaluate(params, name, config)?;
        Ok(ScenarioKpis {
            scenario: name.to_string(),
            adjustment: config.scenarios.resolve(name),
            kpis: evaluation.kpis,
        })
    })?;

    Ok(ScenarioComparison { rows })
}

/// Stress one driver across `shocks`, on top of `scenario`.
///
/// The shock composes multiplicatively with the scenario's own delta for
/// the same driver.
pub fn stress_test(
    params: &ParameterSet,
    scenario: &str,
    kind: StressKind,
    shocks: &[Decimal],
    config: &EngineConfig,
) -> PppFinanceResult<StressTable> {
    if shocks.is_empty() {
        return Err(PppFinanceError::InsufficientData(format!(
            "Stress test on {kind} requires at least one shock"
        )));
    }

    let base = config.scenarios.resolve(scenario);
    let rows = map_points(shocks, |&shock| {
        let adjustment = base.then(&kind.adjustment(shock));
        let evaluation = engine::evaluate_adjusted(params, &adjustment, config)?;
        Ok(StressRow {
            shock,
            kpis: evaluation.kpis,
        })
    })?;

    Ok(StressTable {
        kind,
        scenario: scenario.to_string(),
        rows,
    })
}

/// Inclusive grid from `min` to `max` by `step`; `max` is appended when the
/// step does not land on it.
pub fn sweep_values(min: Decimal, max: Decimal, step: Decimal) -> PppFinanceResult<Vec<Decimal>> {
    if step <= Decimal::ZERO {
        return Err(PppFinanceError::InvalidInput {
            field: "step".into(),
            reason: "Step must be positive".into(),
        });
    }
    if min > max {
        return Err(PppFinanceError::InvalidInput {
            field: "min".into(),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = min;
    while current <= max {
        values.push(current);
        current += step;
    }
    if let Some(&last) = values.last() {
        if last < max {
            values.push(max);
        }
    }

    Ok(values)
}

#[cfg(feature = "parallel")]
fn map_points<T, R, F>(points: &[T], f: F) -> PppFinanceResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> PppFinanceResult<R> + Sync + Send,
{
    use rayon::prelude::*;
    points.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_points<T, R, F>(points: &[T], f: F) -> PppFinanceResult<Vec<R>>
where
    F: Fn(&T) -> PppFinanceResult<R>,
{
    points.iter().map(f).collect()
}
