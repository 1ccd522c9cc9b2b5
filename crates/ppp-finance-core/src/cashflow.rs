use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PppFinanceError;
use crate::parameters::{ParameterField, ParameterSet, MAX_AMOUNT};
use crate::tax::{self, CarryforwardRule};
use crate::types::{Money, Multiple};
use crate::PppFinanceResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One projection year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowRow {
    /// 1-based project year
    pub year: u32,
    pub revenue: Money,
    pub op_cost: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub debt_balance_start: Money,
    pub interest_payment: Money,
    pub principal_repayment: Money,
    pub debt_service: Money,
    pub debt_balance_end: Money,
    pub ebt: Money,
    pub taxable_income: Money,
    pub tax: Money,
    /// Cash flow available for debt service: EBITDA net of tax
    pub cfads: Money,
    /// `None` when there is no debt service to cover
    pub dscr: Option<Multiple>,
}

/// Year-indexed projection, strictly ordered 1..=project_period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowTable {
    pub rows: Vec<CashflowRow>,
    /// Carried tax losses left after the final year
    pub unused_tax_losses: Money,
}

impl CashflowTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cfads(&self) -> Vec<Money> {
        self.rows.iter().map(|r| r.cfads).collect()
    }

    /// DSCR values of years that carry debt service.
    pub fn finite_dscr(&self) -> Vec<Multiple> {
        self.rows.iter().filter_map(|r| r.dscr).collect()
    }

    pub fn total_tax(&self) -> Money {
        self.rows.iter().map(|r| r.tax).sum()
    }

    pub fn total_cfads(&self) -> Money {
        self.rows.iter().map(|r| r.cfads).sum()
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Build the cashflow table with the default loss carryforward rule.
pub fn build(params: &ParameterSet) -> PppFinanceResult<CashflowTable> {
    build_with_rule(params, CarryforwardRule::default())
}

/// Build the year-by-year cashflow table for an (already adjusted) parameter set.
///
/// Revenue grows at `revenue_growth`; operating cost is a share of revenue
/// escalated by `inflation`. Depreciation is straight-line over
/// `depreciation_period`. Debt is `total_investment × (1 − equity_ratio)`,
/// amortised in equal principal instalments over `project_period` with
/// interest on the opening balance. Tax comes from a sequential pass over
/// EBT with loss carryforward.
pub fn build_with_rule(
    params: &ParameterSet,
    rule: CarryforwardRule,
) -> PppFinanceResult<CashflowTable> {
    params.validate()?;

    let years = params.project_period;
    let annual_depreciation =
        params.total_investment / Decimal::from(params.depreciation_period);
    let debt_investment = params.debt_investment();
    let annual_principal = debt_investment / Decimal::from(years);

    let growth = Decimal::ONE + params.revenue_growth;
    let escalation = Decimal::ONE + params.inflation;
    let mut growth_factor = Decimal::ONE;
    let mut inflation_factor = Decimal::ONE;

    let mut rows: Vec<CashflowRow> = Vec::with_capacity(years as usize);

    // Pre-tax pass
    for year in 1..=years {
        if year > 1 {
            growth_factor = in_range(
                growth_factor.checked_mul(growth),
                ParameterField::RevenueGrowth,
                year,
            )?;
            inflation_factor = in_range(
                inflation_factor.checked_mul(escalation),
                ParameterField::Inflation,
                year,
            )?;
        }

        let revenue = in_range(
            params.initial_revenue.checked_mul(growth_factor),
            ParameterField::RevenueGrowth,
            year,
        )?;
        let base_cost = in_range(
            revenue.checked_mul(params.op_cost_ratio),
            ParameterField::OpCostRatio,
            year,
        )?;
        let op_cost = in_range(
            base_cost.checked_mul(inflation_factor),
            ParameterField::Inflation,
            year,
        )?;
        let ebitda = revenue - op_cost;

        let depreciation = if year <= params.depreciation_period {
            annual_depreciation
        } else {
            Decimal::ZERO
        };
        let ebit = ebitda - depreciation;

        let debt_balance_start =
            (debt_investment - annual_principal * Decimal::from(year - 1)).max(Decimal::ZERO);
        let interest_payment = in_range(
            debt_balance_start.checked_mul(params.debt_rate),
            ParameterField::DebtRate,
            year,
        )?;
        let principal_repayment = if debt_balance_start > Decimal::ZERO {
            annual_principal
        } else {
            Decimal::ZERO
        };
        let debt_service = interest_payment + principal_repayment;
        let debt_balance_end = (debt_balance_start - principal_repayment).max(Decimal::ZERO);

        let ebt = ebit - interest_payment;

        rows.push(CashflowRow {
            year,
            revenue,
            op_cost,
            ebitda,
            depreciation,
            ebit,
            debt_balance_start,
            interest_payment,
            principal_repayment,
            debt_service,
            debt_balance_end,
            ebt,
            taxable_income: Decimal::ZERO,
            tax: Decimal::ZERO,
            cfads: Decimal::ZERO,
            dscr: None,
        });
    }

    // Tax needs the whole EBT sequence in year order
    let ebt: Vec<Money> = rows.iter().map(|r| r.ebt).collect();
    let schedule = tax::compute_taxes(&ebt, params.tax_rate, rule);

    for (row, tax_year) in rows.iter_mut().zip(&schedule.years) {
        row.taxable_income = tax_year.taxable_income;
        row.tax = tax_year.tax;
        row.cfads = row.ebitda - row.tax;
        row.dscr = if row.debt_service > Decimal::ZERO {
            Some(in_range(
                row.cfads.checked_div(row.debt_service),
                ParameterField::EquityRatio,
                row.year,
            )?)
        } else {
            None
        };
    }

    tracing::debug!(
        years,
        debt_investment = %debt_investment,
        unused_tax_losses = %schedule.unused_losses,
        "built cashflow table"
    );

    Ok(CashflowTable {
        rows,
        unused_tax_losses: schedule.unused_losses,
    })
}

/// Checked result bounded by [`MAX_AMOUNT`], blaming `field` otherwise.
fn in_range(value: Option<Decimal>, field: ParameterField, year: u32) -> PppFinanceResult<Decimal> {
    match value {
        Some(v) if v.abs() <= MAX_AMOUNT => Ok(v),
        _ => Err(PppFinanceError::InvalidInput {
            field: field.to_string(),
            reason: format!("Projection leaves the supported numeric range in year {year}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reference_table() -> CashflowTable {
        build(&ParameterSet::default()).unwrap()
    }

    #[test]
    fn test_reference_year_one() {
        let table = reference_table();
        let y1 = &table.rows[0];

        assert_eq!(y1.year, 1);
        assert_eq!(y1.revenue, dec!(1000));
        assert_eq!(y1.op_cost, dec!(350));
        assert_eq!(y1.ebitda, dec!(650));
        assert_eq!(y1.depreciation, dec!(200));
        assert_eq!(y1.ebit, dec!(450));
        assert_eq!(y1.debt_balance_start, dec!(3500));
        assert_eq!(y1.interest_payment, dec!(315));
        assert_eq!(y1.principal_repayment, dec!(140));
        assert_eq!(y1.debt_service, dec!(455));
        assert_eq!(y1.ebt, dec!(135));
        assert_eq!(y1.taxable_income, dec!(135));
        assert_eq!(y1.tax, dec!(27));
        assert_eq!(y1.cfads, dec!(623));

        let dscr = y1.dscr.unwrap();
        assert!((dscr - dec!(1.369)).abs() < dec!(0.001), "DSCR(1) = {dscr}");
    }

    #[test]
    fn test_reference_year_two_growth_and_inflation() {
        let table = reference_table();
        let y2 = &table.rows[1];

        assert_eq!(y2.revenue, dec!(1030));
        // 1030 × 0.35 × 1.03
        assert_eq!(y2.op_cost, dec!(371.3150));
        assert_eq!(y2.debt_balance_start, dec!(3360));
        assert_eq!(y2.interest_payment, dec!(302.40));
    }

    #[test]
    fn test_rows_cover_every_year_in_order() {
        let table = reference_table();
        assert_eq!(table.len(), 25);
        for (i, row) in table.rows.iter().enumerate() {
            assert_eq!(row.year, i as u32 + 1);
        }
    }

    #[test]
    fn test_debt_fully_amortised() {
        let params = ParameterSet {
            project_period: 30,
            depreciation_period: 30,
            ..ParameterSet::default()
        };
        let table = build(&params).unwrap();

        let mut previous = Decimal::MAX;
        for row in &table.rows {
            assert!(row.debt_balance_start >= Decimal::ZERO);
            assert!(row.debt_balance_start <= previous);
            previous = row.debt_balance_start;
        }
        let last = table.rows.last().unwrap();
        assert!(last.debt_balance_end.abs() < dec!(0.000001));
    }

    #[test]
    fn test_no_depreciation_beyond_horizon() {
        let params = ParameterSet {
            depreciation_period: 10,
            ..ParameterSet::default()
        };
        let table = build(&params).unwrap();

        assert_eq!(table.rows[9].depreciation, dec!(500));
        assert_eq!(table.rows[10].depreciation, Decimal::ZERO);
    }

    #[test]
    fn test_all_equity_has_undefined_dscr() {
        let params = ParameterSet {
            equity_ratio: Decimal::ONE,
            ..ParameterSet::default()
        };
        let table = build(&params).unwrap();

        for row in &table.rows {
            assert_eq!(row.debt_service, Decimal::ZERO);
            assert_eq!(row.interest_payment, Decimal::ZERO);
            assert!(row.dscr.is_none());
        }
        assert!(table.finite_dscr().is_empty());
    }

    #[test]
    fn test_dscr_matches_cfads_over_debt_service() {
        let table = reference_table();
        for row in &table.rows {
            match row.dscr {
                Some(dscr) => assert_eq!(dscr, row.cfads / row.debt_service),
                None => assert_eq!(row.debt_service, Decimal::ZERO),
            }
        }
    }

    #[test]
    fn test_loss_years_pay_no_tax() {
        // Heavy depreciation and interest push early years into loss
        let params = ParameterSet {
            initial_revenue: dec!(500),
            depreciation_period: 5,
            ..ParameterSet::default()
        };
        let table = build(&params).unwrap();

        assert!(table.rows[0].ebt < Decimal::ZERO);
        for row in &table.rows {
            assert!(row.tax >= Decimal::ZERO);
            assert!(row.taxable_income >= Decimal::ZERO);
            if row.ebt < Decimal::ZERO {
                assert_eq!(row.tax, Decimal::ZERO);
                assert_eq!(row.cfads, row.ebitda);
            }
        }
        assert!(table.unused_tax_losses > Decimal::ZERO);
    }

    #[test]
    fn test_offset_rule_lowers_total_tax() {
        let params = ParameterSet {
            initial_revenue: dec!(500),
            depreciation_period: 5,
            ..ParameterSet::default()
        };
        let deficit_only = build_with_rule(&params, CarryforwardRule::DeficitYearsOnly).unwrap();
        let offset = build_with_rule(&params, CarryforwardRule::OffsetProfits).unwrap();

        assert!(offset.total_tax() < deficit_only.total_tax());
    }

    #[test]
    fn test_invalid_period_rejected() {
        let params = ParameterSet {
            project_period: 0,
            ..ParameterSet::default()
        };
        assert!(build(&params).is_err());
    }
}
