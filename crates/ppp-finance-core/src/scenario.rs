use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::parameters::ParameterSet;
use crate::types::Rate;

pub const BASE_CASE: &str = "Base Case";
pub const DOWNSIDE: &str = "Downside";
pub const UPSIDE: &str = "Upside";

/// Fractional multiplicative deltas applied to a parameter set.
///
/// A delta of `0.10` scales its target by 1.10; `-0.15` scales it by 0.85.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScenarioAdjustment {
    /// Capex overrun (+) or saving (-) applied to total_investment
    #[serde(default)]
    pub capex_adj: Rate,
    /// Change applied to initial_revenue
    #[serde(default)]
    pub revenue_adj: Rate,
    /// Change applied to op_cost_ratio
    #[serde(default)]
    pub opex_adj: Rate,
    /// Relative change applied to debt_rate
    #[serde(default)]
    pub debt_rate_adj: Rate,
}

impl ScenarioAdjustment {
    pub const NONE: ScenarioAdjustment = ScenarioAdjustment {
        capex_adj: Decimal::ZERO,
        revenue_adj: Decimal::ZERO,
        opex_adj: Decimal::ZERO,
        debt_rate_adj: Decimal::ZERO,
    };

    /// 10% capex overrun, 15% revenue drop, 5% opex increase, 1% higher debt rate.
    pub fn downside() -> Self {
        Self {
            capex_adj: dec!(0.10),
            revenue_adj: dec!(-0.15),
            opex_adj: dec!(0.05),
            debt_rate_adj: dec!(0.01),
        }
    }

    /// 5% capex saving, 10% revenue boost, 5% opex saving, 0.5% lower debt rate.
    pub fn upside() -> Self {
        Self {
            capex_adj: dec!(-0.05),
            revenue_adj: dec!(0.10),
            opex_adj: dec!(-0.05),
            debt_rate_adj: dec!(-0.005),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::NONE
    }

    /// Derive the adjusted parameter set. The input is left untouched.
    ///
    /// Arithmetic saturates; out-of-range results are rejected when the
    /// adjusted set is validated.
    pub fn apply(&self, params: &ParameterSet) -> ParameterSet {
        let scale = |value: Decimal, adj: Rate| value.saturating_mul(Decimal::ONE.saturating_add(adj));
        ParameterSet {
            total_investment: scale(params.total_investment, self.capex_adj),
            initial_revenue: scale(params.initial_revenue, self.revenue_adj),
            op_cost_ratio: scale(params.op_cost_ratio, self.opex_adj),
            debt_rate: scale(params.debt_rate, self.debt_rate_adj),
            ..params.clone()
        }
    }

    /// Single adjustment equivalent to applying `self` then `other`.
    pub fn then(&self, other: &ScenarioAdjustment) -> ScenarioAdjustment {
        let chain = |a: Rate, b: Rate| {
            Decimal::ONE
                .saturating_add(a)
                .saturating_mul(Decimal::ONE.saturating_add(b))
                .saturating_sub(Decimal::ONE)
        };
        ScenarioAdjustment {
            capex_adj: chain(self.capex_adj, other.capex_adj),
            revenue_adj: chain(self.revenue_adj, other.revenue_adj),
            opex_adj: chain(self.opex_adj, other.opex_adj),
            debt_rate_adj: chain(self.debt_rate_adj, other.debt_rate_adj),
        }
    }
}

/// Named scenario adjustments.
///
/// Always contains the three built-in scenarios unless a caller overrides
/// them by name. Lookups of unknown names resolve to the Base Case profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, ScenarioAdjustment>,
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        let mut scenarios = BTreeMap::new();
        scenarios.insert(BASE_CASE.to_string(), ScenarioAdjustment::NONE);
        scenarios.insert(DOWNSIDE.to_string(), ScenarioAdjustment::downside());
        scenarios.insert(UPSIDE.to_string(), ScenarioAdjustment::upside());
        Self { scenarios }
    }
}

impl ScenarioRegistry {
    /// Add or replace a named scenario.
    pub fn register(&mut self, name: impl Into<String>, adjustment: ScenarioAdjustment) {
        self.scenarios.insert(name.into(), adjustment);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    /// Adjustment for `name`, falling back to Base Case for unknown names.
    pub fn resolve(&self, name: &str) -> ScenarioAdjustment {
        self.scenarios
            .get(name)
            .or_else(|| self.scenarios.get(BASE_CASE))
            .copied()
            .unwrap_or(ScenarioAdjustment::NONE)
    }

    /// Apply the named scenario to `params`.
    pub fn adjust(&self, params: &ParameterSet, name: &str) -> ParameterSet {
        self.resolve(name).apply(params)
    }
}

impl Serialize for ScenarioRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.scenarios.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScenarioRegistry {
    /// Entries are layered over the built-in scenarios.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, ScenarioAdjustment>::deserialize(deserializer)?;
        let mut registry = ScenarioRegistry::default();
        registry.scenarios.extend(entries);
        Ok(registry)
    }
}

/// Apply a built-in scenario by name; unknown names behave as Base Case.
pub fn adjust(params: &ParameterSet, scenario_name: &str) -> ParameterSet {
    ScenarioRegistry::default().adjust(params, scenario_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base_case_is_identity() {
        let params = ParameterSet::default();
        assert_eq!(adjust(&params, BASE_CASE), params);
    }

    #[test]
    fn test_unknown_scenario_falls_back_to_base_case() {
        let params = ParameterSet::default();
        assert_eq!(adjust(&params, "Hurricane"), params);
    }

    #[test]
    fn test_downside_adjustment() {
        let params = ParameterSet::default();
        let adjusted = adjust(&params, DOWNSIDE);

        assert_eq!(adjusted.total_investment, dec!(5500));
        assert_eq!(adjusted.initial_revenue, dec!(850));
        assert_eq!(adjusted.op_cost_ratio, dec!(0.3675));
        assert_eq!(adjusted.debt_rate, dec!(0.0909));
        // Untouched fields
        assert_eq!(adjusted.discount_rate, params.discount_rate);
        assert_eq!(adjusted.project_period, params.project_period);
        // Input not mutated
        assert_eq!(params.total_investment, dec!(5000));
    }

    #[test]
    fn test_upside_adjustment() {
        let adjusted = adjust(&ParameterSet::default(), UPSIDE);
        assert_eq!(adjusted.total_investment, dec!(4750));
        assert_eq!(adjusted.initial_revenue, dec!(1100));
        assert_eq!(adjusted.debt_rate, dec!(0.08955));
    }

    #[test]
    fn test_then_composes_multiplicatively() {
        let shock = ScenarioAdjustment {
            revenue_adj: dec!(-0.10),
            ..ScenarioAdjustment::NONE
        };
        let combined = ScenarioAdjustment::downside().then(&shock);
        let params = ParameterSet::default();

        let stepwise = shock.apply(&ScenarioAdjustment::downside().apply(&params));
        assert_eq!(combined.apply(&params), stepwise);
        assert_eq!(combined.revenue_adj, dec!(-0.235));
    }

    #[test]
    fn test_registered_scenario_resolves() {
        let mut registry = ScenarioRegistry::default();
        let severe = ScenarioAdjustment {
            capex_adj: dec!(0.25),
            ..ScenarioAdjustment::NONE
        };
        registry.register("Severe", severe);

        assert!(registry.contains("Severe"));
        assert_eq!(registry.resolve("Severe"), severe);
        assert_eq!(
            registry.adjust(&ParameterSet::default(), "Severe").total_investment,
            dec!(6250)
        );
    }

    #[test]
    fn test_deserialize_layers_over_builtins() {
        let registry: ScenarioRegistry =
            serde_json::from_str(r#"{"Severe": {"capex_adj": "0.25"}}"#).unwrap();

        assert!(registry.contains(BASE_CASE));
        assert!(registry.contains(DOWNSIDE));
        assert!(registry.contains(UPSIDE));
        assert_eq!(registry.resolve("Severe").capex_adj, dec!(0.25));
        assert_eq!(registry.resolve("Severe").revenue_adj, Decimal::ZERO);
    }
}
