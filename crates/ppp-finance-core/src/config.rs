use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::benchmarks::FinancialBenchmarks;
use crate::scenario::{ScenarioAdjustment, ScenarioRegistry};
use crate::tax::CarryforwardRule;
use crate::PppFinanceResult;

/// Engine-wide settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Named scenarios, layered over Base Case / Downside / Upside
    pub scenarios: ScenarioRegistry,
    pub benchmarks: FinancialBenchmarks,
    pub stress_tests: StressTestConfig,
    pub carryforward: CarryforwardRule,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> PppFinanceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Which scenario delta a stress shock moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressKind {
    Revenue,
    Opex,
    DebtRate,
}

impl StressKind {
    /// Adjustment that applies `shock` to this driver only.
    pub fn adjustment(&self, shock: Decimal) -> ScenarioAdjustment {
        match self {
            StressKind::Revenue => ScenarioAdjustment {
                revenue_adj: shock,
                ..ScenarioAdjustment::NONE
            },
            StressKind::Opex => ScenarioAdjustment {
                opex_adj: shock,
                ..ScenarioAdjustment::NONE
            },
            StressKind::DebtRate => ScenarioAdjustment {
                debt_rate_adj: shock,
                ..ScenarioAdjustment::NONE
            },
        }
    }
}

impl std::fmt::Display for StressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StressKind::Revenue => write!(f, "revenue_shock"),
            StressKind::Opex => write!(f, "opex_shock"),
            StressKind::DebtRate => write!(f, "debt_rate_shock"),
        }
    }
}

/// Default shock grids per stress driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressTestConfig {
    pub revenue_shock: Vec<Decimal>,
    pub opex_shock: Vec<Decimal>,
    pub debt_rate_shock: Vec<Decimal>,
}

impl Default for StressTestConfig {
    fn default() -> Self {
        Self {
            revenue_shock: vec![dec!(-0.30), dec!(-0.20), dec!(-0.10), dec!(0), dec!(0.10)],
            opex_shock: vec![dec!(-0.10), dec!(0), dec!(0.10), dec!(0.20), dec!(0.30)],
            debt_rate_shock: vec![dec!(-0.02), dec!(-0.01), dec!(0), dec!(0.01), dec!(0.02)],
        }
    }
}

impl StressTestConfig {
    pub fn shocks(&self, kind: StressKind) -> &[Decimal] {
        match kind {
            StressKind::Revenue => &self.revenue_shock,
            StressKind::Opex => &self.opex_shock,
            StressKind::DebtRate => &self.debt_rate_shock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{BASE_CASE, DOWNSIDE};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.scenarios.contains(BASE_CASE));
        assert_eq!(config.carryforward, CarryforwardRule::DeficitYearsOnly);
    }

    #[test]
    fn test_partial_config_overrides() {
        let config = EngineConfig::from_json_str(
            r#"{
                "benchmarks": {"min_dscr": "1.30"},
                "scenarios": {"Delay": {"capex_adj": "0.20", "revenue_adj": "-0.05"}},
                "stress_tests": {"revenue_shock": ["-0.5", "0"]},
                "carryforward": "offset_profits"
            }"#,
        )
        .unwrap();

        assert_eq!(config.benchmarks.min_dscr, dec!(1.30));
        assert_eq!(config.benchmarks.target_dscr, dec!(1.50));
        assert!(config.scenarios.contains("Delay"));
        assert!(config.scenarios.contains(DOWNSIDE));
        assert_eq!(config.stress_tests.shocks(StressKind::Revenue).len(), 2);
        assert_eq!(config.stress_tests.shocks(StressKind::Opex).len(), 5);
        assert_eq!(config.carryforward, CarryforwardRule::OffsetProfits);
    }

    #[test]
    fn test_malformed_config_is_serialization_error() {
        let err = EngineConfig::from_json_str(r#"{"benchmarks": 3}"#).unwrap_err();
        assert!(matches!(err, crate::PppFinanceError::SerializationError(_)));
    }

    #[test]
    fn test_stress_kind_adjustment_targets_one_driver() {
        let adj = StressKind::Opex.adjustment(dec!(0.2));
        assert_eq!(adj.opex_adj, dec!(0.2));
        assert_eq!(adj.revenue_adj, Decimal::ZERO);
        assert_eq!(adj.capex_adj, Decimal::ZERO);
        assert_eq!(adj.debt_rate_adj, Decimal::ZERO);
    }
}
