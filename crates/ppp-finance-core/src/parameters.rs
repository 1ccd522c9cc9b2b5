use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PppFinanceError;
use crate::types::{Money, Rate};
use crate::PppFinanceResult;

/// Largest amount (currency-millions) an input or projected line item may
/// reach. Sums over a projection stay well inside Decimal range below it.
pub const MAX_AMOUNT: Money = dec!(1000000000000000000000);

// ---------------------------------------------------------------------------
// Parameter set
// ---------------------------------------------------------------------------

/// Financial assumptions for one PPP projection.
///
/// Constructed once per request and never mutated by the engine; scenario
/// adjustments and sensitivity overrides always derive a new copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Total capital investment (currency-millions)
    pub total_investment: Money,
    /// Projection horizon and debt amortisation period in years
    pub project_period: u32,
    /// Straight-line depreciation horizon in years
    pub depreciation_period: u32,
    /// Share of the investment funded by equity (debt funds the rest)
    pub equity_ratio: Rate,
    /// Annual interest rate on the outstanding debt balance
    pub debt_rate: Rate,
    /// Discount rate for NPV and profitability index
    pub discount_rate: Rate,
    /// Flat corporate tax rate
    pub tax_rate: Rate,
    /// Year-1 revenue
    pub initial_revenue: Money,
    /// Annual revenue growth (may be negative)
    pub revenue_growth: Rate,
    /// Operating cost as a share of revenue before inflation
    pub op_cost_ratio: Rate,
    /// Annual cost inflation applied on top of op_cost_ratio
    pub inflation: Rate,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            total_investment: dec!(5000),
            project_period: 25,
            depreciation_period: 25,
            equity_ratio: dec!(0.30),
            debt_rate: dec!(0.09),
            discount_rate: dec!(0.15),
            tax_rate: dec!(0.20),
            initial_revenue: dec!(1000),
            revenue_growth: dec!(0.03),
            op_cost_ratio: dec!(0.35),
            inflation: dec!(0.03),
        }
    }
}

impl ParameterSet {
    /// Share of the investment funded by debt.
    pub fn debt_ratio(&self) -> Rate {
        Decimal::ONE - self.equity_ratio
    }

    pub fn equity_investment(&self) -> Money {
        self.total_investment * self.equity_ratio
    }

    pub fn debt_investment(&self) -> Money {
        self.total_investment * self.debt_ratio()
    }

    /// Reject parameter sets the engine cannot evaluate.
    pub fn validate(&self) -> PppFinanceResult<()> {
        if self.total_investment <= Decimal::ZERO {
            return Err(PppFinanceError::InvalidInput {
                field: "total_investment".into(),
                reason: "Total investment must be positive".into(),
            });
        }

        if self.total_investment > MAX_AMOUNT {
            return Err(PppFinanceError::InvalidInput {
                field: "total_investment".into(),
                reason: format!("Total investment must not exceed {MAX_AMOUNT}"),
            });
        }

        if self.project_period == 0 {
            return Err(PppFinanceError::InvalidInput {
                field: "project_period".into(),
                reason: "Project period must be at least 1 year".into(),
            });
        }

        if self.depreciation_period == 0 {
            return Err(PppFinanceError::InvalidInput {
                field: "depreciation_period".into(),
                reason: "Depreciation period must be at least 1 year".into(),
            });
        }

        if self.equity_ratio < Decimal::ZERO || self.equity_ratio > Decimal::ONE {
            return Err(PppFinanceError::InvalidInput {
                field: "equity_ratio".into(),
                reason: "Equity ratio must be between 0 and 1".into(),
            });
        }

        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(PppFinanceError::InvalidInput {
                field: "tax_rate".into(),
                reason: "Tax rate must be between 0 and 1".into(),
            });
        }

        if self.discount_rate <= dec!(-1) {
            return Err(PppFinanceError::InvalidInput {
                field: "discount_rate".into(),
                reason: "Discount rate must be greater than -100%".into(),
            });
        }

        if self.revenue_growth <= dec!(-1) {
            return Err(PppFinanceError::InvalidInput {
                field: "revenue_growth".into(),
                reason: "Revenue growth must be greater than -100%".into(),
            });
        }

        if self.initial_revenue <= Decimal::ZERO {
            return Err(PppFinanceError::InvalidInput {
                field: "initial_revenue".into(),
                reason: "Initial revenue must be positive".into(),
            });
        }

        if self.initial_revenue > MAX_AMOUNT {
            return Err(PppFinanceError::InvalidInput {
                field: "initial_revenue".into(),
                reason: format!("Initial revenue must not exceed {MAX_AMOUNT}"),
            });
        }

        if self.op_cost_ratio < Decimal::ZERO {
            return Err(PppFinanceError::InvalidInput {
                field: "op_cost_ratio".into(),
                reason: "Operating cost ratio cannot be negative".into(),
            });
        }

        Ok(())
    }

    /// Soft checks: values the engine accepts but an analyst should see.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.op_cost_ratio > Decimal::ONE {
            warnings.push(format!(
                "Operating cost ratio ({}) exceeds 100% of revenue",
                self.op_cost_ratio
            ));
        }
        if self.depreciation_period > self.project_period {
            warnings.push(format!(
                "Depreciation period ({}y) extends beyond the project period ({}y); the tail is never expensed",
                self.depreciation_period, self.project_period
            ));
        }
        if self.debt_rate < Decimal::ZERO {
            warnings.push(format!("Negative debt rate ({})", self.debt_rate));
        }

        for range in parameter_ranges() {
            let value = self.get(range.field);
            if value < range.min || value > range.max {
                warnings.push(format!(
                    "{} = {} is outside the typical range [{}, {}]",
                    range.field, value, range.min, range.max
                ));
            }
        }

        warnings
    }

    /// Read a single field as a decimal.
    pub fn get(&self, field: ParameterField) -> Decimal {
        match field {
            ParameterField::TotalInvestment => self.total_investment,
            ParameterField::ProjectPeriod => Decimal::from(self.project_period),
            ParameterField::DepreciationPeriod => Decimal::from(self.depreciation_period),
            ParameterField::EquityRatio => self.equity_ratio,
            ParameterField::DebtRate => self.debt_rate,
            ParameterField::DiscountRate => self.discount_rate,
            ParameterField::TaxRate => self.tax_rate,
            ParameterField::InitialRevenue => self.initial_revenue,
            ParameterField::RevenueGrowth => self.revenue_growth,
            ParameterField::OpCostRatio => self.op_cost_ratio,
            ParameterField::Inflation => self.inflation,
        }
    }

    /// Copy of this set with one field replaced.
    ///
    /// Period fields only accept whole, non-negative numbers of years.
    pub fn with_field(&self, field: ParameterField, value: Decimal) -> PppFinanceResult<Self> {
        let mut next = self.clone();
        match field {
            ParameterField::TotalInvestment => next.total_investment = value,
            ParameterField::ProjectPeriod => next.project_period = whole_years(field, value)?,
            ParameterField::DepreciationPeriod => {
                next.depreciation_period = whole_years(field, value)?
            }
            ParameterField::EquityRatio => next.equity_ratio = value,
            ParameterField::DebtRate => next.debt_rate = value,
            ParameterField::DiscountRate => next.discount_rate = value,
            ParameterField::TaxRate => next.tax_rate = value,
            ParameterField::InitialRevenue => next.initial_revenue = value,
            ParameterField::RevenueGrowth => next.revenue_growth = value,
            ParameterField::OpCostRatio => next.op_cost_ratio = value,
            ParameterField::Inflation => next.inflation = value,
        }
        Ok(next)
    }
}

fn whole_years(field: ParameterField, value: Decimal) -> PppFinanceResult<u32> {
    if value.fract() != Decimal::ZERO {
        return Err(PppFinanceError::InvalidInput {
            field: field.to_string(),
            reason: format!("Expected a whole number of years, got {value}"),
        });
    }
    value.to_u32().ok_or_else(|| PppFinanceError::InvalidInput {
        field: field.to_string(),
        reason: format!("Expected a non-negative number of years, got {value}"),
    })
}

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Addressable fields of a [`ParameterSet`], named as in its serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterField {
    TotalInvestment,
    ProjectPeriod,
    DepreciationPeriod,
    EquityRatio,
    DebtRate,
    DiscountRate,
    TaxRate,
    InitialRevenue,
    RevenueGrowth,
    OpCostRatio,
    Inflation,
}

impl ParameterField {
    pub const ALL: [ParameterField; 11] = [
        ParameterField::TotalInvestment,
        ParameterField::ProjectPeriod,
        ParameterField::DepreciationPeriod,
        ParameterField::EquityRatio,
        ParameterField::DebtRate,
        ParameterField::DiscountRate,
        ParameterField::TaxRate,
        ParameterField::InitialRevenue,
        ParameterField::RevenueGrowth,
        ParameterField::OpCostRatio,
        ParameterField::Inflation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterField::TotalInvestment => "total_investment",
            ParameterField::ProjectPeriod => "project_period",
            ParameterField::DepreciationPeriod => "depreciation_period",
            ParameterField::EquityRatio => "equity_ratio",
            ParameterField::DebtRate => "debt_rate",
            ParameterField::DiscountRate => "discount_rate",
            ParameterField::TaxRate => "tax_rate",
            ParameterField::InitialRevenue => "initial_revenue",
            ParameterField::RevenueGrowth => "revenue_growth",
            ParameterField::OpCostRatio => "op_cost_ratio",
            ParameterField::Inflation => "inflation",
        }
    }
}

impl std::fmt::Display for ParameterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterField {
    type Err = PppFinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| PppFinanceError::UnknownField(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Typical ranges
// ---------------------------------------------------------------------------

/// Typical analyst range for a parameter, with its default and step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub field: ParameterField,
    pub min: Decimal,
    pub max: Decimal,
    pub default: Decimal,
    pub step: Decimal,
}

/// Ranges for the parameters an analyst usually explores.
pub fn parameter_ranges() -> Vec<ParameterRange> {
    let range = |field, min, max, default, step| ParameterRange {
        field,
        min,
        max,
        default,
        step,
    };

    vec![
        range(
            ParameterField::TotalInvestment,
            dec!(500),
            dec!(20000),
            dec!(5000),
            dec!(100),
        ),
        range(
            ParameterField::EquityRatio,
            dec!(0.05),
            dec!(0.95),
            dec!(0.30),
            dec!(0.01),
        ),
        range(
            ParameterField::DebtRate,
            dec!(0.01),
            dec!(0.25),
            dec!(0.09),
            dec!(0.005),
        ),
        range(
            ParameterField::DiscountRate,
            dec!(0.05),
            dec!(0.30),
            dec!(0.15),
            dec!(0.005),
        ),
        range(
            ParameterField::RevenueGrowth,
            dec!(-0.05),
            dec!(0.15),
            dec!(0.03),
            dec!(0.005),
        ),
        range(
            ParameterField::ProjectPeriod,
            dec!(10),
            dec!(40),
            dec!(25),
            dec!(1),
        ),
        range(
            ParameterField::OpCostRatio,
            dec!(0.10),
            dec!(0.80),
            dec!(0.35),
            dec!(0.01),
        ),
    ]
}

/// Typical range for one field, if one is defined.
pub fn parameter_range(field: ParameterField) -> Option<ParameterRange> {
    parameter_ranges().into_iter().find(|r| r.field == field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = ParameterSet::default();
        assert!(params.validate().is_ok());
        assert!(params.warnings().is_empty());
    }

    #[test]
    fn test_debt_ratio_complements_equity() {
        let params = ParameterSet::default();
        assert_eq!(params.debt_ratio() + params.equity_ratio, Decimal::ONE);
        assert_eq!(params.debt_investment(), dec!(3500));
        assert_eq!(params.equity_investment(), dec!(1500));
    }

    #[test]
    fn test_zero_project_period_rejected() {
        let params = ParameterSet {
            project_period: 0,
            ..ParameterSet::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("project_period"));
    }

    #[test]
    fn test_zero_depreciation_period_rejected() {
        let params = ParameterSet {
            depreciation_period: 0,
            ..ParameterSet::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_equity_ratio_outside_unit_interval_rejected() {
        for ratio in [dec!(-0.1), dec!(1.1)] {
            let params = ParameterSet {
                equity_ratio: ratio,
                ..ParameterSet::default()
            };
            assert!(params.validate().is_err(), "ratio {ratio} accepted");
        }
    }

    #[test]
    fn test_amounts_above_supported_range_rejected() {
        let params = ParameterSet {
            initial_revenue: MAX_AMOUNT + Decimal::ONE,
            ..ParameterSet::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PppFinanceError::InvalidInput { field, .. }) if field == "initial_revenue"
        ));
    }

    #[test]
    fn test_out_of_range_value_warns() {
        let params = ParameterSet {
            discount_rate: dec!(0.45),
            ..ParameterSet::default()
        };
        assert!(params.validate().is_ok());
        assert!(params
            .warnings()
            .iter()
            .any(|w| w.starts_with("discount_rate")));
    }

    #[test]
    fn test_with_field_leaves_original_untouched() {
        let params = ParameterSet::default();
        let next = params
            .with_field(ParameterField::DiscountRate, dec!(0.10))
            .unwrap();
        assert_eq!(next.discount_rate, dec!(0.10));
        assert_eq!(params.discount_rate, dec!(0.15));
    }

    #[test]
    fn test_with_field_rejects_fractional_years() {
        let params = ParameterSet::default();
        assert!(params
            .with_field(ParameterField::ProjectPeriod, dec!(20.5))
            .is_err());
        let next = params
            .with_field(ParameterField::ProjectPeriod, dec!(20))
            .unwrap();
        assert_eq!(next.project_period, 20);
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in ParameterField::ALL {
            assert_eq!(field.as_str().parse::<ParameterField>().unwrap(), field);
        }
        assert!(matches!(
            "capex".parse::<ParameterField>(),
            Err(PppFinanceError::UnknownField(_))
        ));
    }
}
