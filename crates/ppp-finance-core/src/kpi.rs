use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::cashflow::CashflowTable;
use crate::error::PppFinanceError;
use crate::parameters::{ParameterField, ParameterSet};
use crate::time_value;
use crate::types::{Money, Multiple, Rate};
use crate::PppFinanceResult;

const IRR_GUESS: Rate = dec!(0.10);

/// Headline metrics derived from one cashflow table.
///
/// Undefined metrics serialize as `null`: an IRR that does not converge,
/// a minimum DSCR without any debt service, a payback that never happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    /// NPV of [-total_investment, CFADS(1..n)] at the discount rate
    pub project_npv: Money,
    pub project_irr: Option<Rate>,
    pub min_dscr: Option<Multiple>,
    /// Mean of the finite DSCR values, 0 when there are none
    pub avg_dscr: Multiple,
    /// First year in which cumulative CFADS is non-negative
    pub payback_period: Option<u32>,
    /// First year in which cumulative CFADS recovers the total investment
    pub investment_payback_period: Option<u32>,
    /// PV(CFADS) / equity investment
    pub profitability_index: Multiple,
    pub equity_npv: Money,
    pub debt_coverage: Multiple,
    /// PV(CFADS over the loan life, at the debt rate) / debt investment
    pub llcr: Option<Multiple>,
    pub total_cfads: Money,
    pub total_tax: Money,
    pub unused_tax_losses: Money,
}

/// Derive the KPI summary for an adjusted parameter set and its cashflow table.
pub fn aggregate(params: &ParameterSet, table: &CashflowTable) -> PppFinanceResult<KpiSummary> {
    let cfads = table.cfads();

    // --- NPV / IRR on the project cashflow ---
    let mut project_cashflow = Vec::with_capacity(cfads.len() + 1);
    project_cashflow.push(-params.total_investment);
    project_cashflow.extend_from_slice(&cfads);

    let project_npv = time_value::npv(params.discount_rate, &project_cashflow)
        .map_err(blame(ParameterField::DiscountRate))?;

    let project_irr = match time_value::irr(&project_cashflow, IRR_GUESS) {
        Ok(rate) => Some(rate),
        Err(e) => {
            tracing::warn!(error = %e, "project IRR unavailable");
            None
        }
    };

    // --- DSCR statistics ---
    let (min_dscr, avg_dscr) = dscr_statistics(&table.finite_dscr());

    // --- Payback ---
    let payback_period = first_year_reaching(&cfads, Decimal::ZERO);
    let investment_payback_period = first_year_reaching(&cfads, params.total_investment);

    // --- Profitability index ---
    let pv_inflows = time_value::present_value(params.discount_rate, &cfads)
        .map_err(blame(ParameterField::DiscountRate))?;
    let equity_investment = params.equity_investment();
    let profitability_index = if equity_investment > Decimal::ZERO {
        pv_inflows
            .checked_div(equity_investment)
            .ok_or_else(|| PppFinanceError::InvalidInput {
                field: ParameterField::EquityRatio.to_string(),
                reason: "Profitability index leaves the supported numeric range".into(),
            })?
    } else {
        Decimal::ZERO
    };

    let llcr = loan_life_coverage(params, table);

    Ok(KpiSummary {
        project_npv,
        project_irr,
        min_dscr,
        avg_dscr,
        payback_period,
        investment_payback_period,
        profitability_index,
        equity_npv: project_npv,
        debt_coverage: avg_dscr,
        llcr,
        total_cfads: table.total_cfads(),
        total_tax: table.total_tax(),
        unused_tax_losses: table.unused_tax_losses,
    })
}

/// Minimum and mean of finite DSCR values.
///
/// With no finite values the minimum is undefined while the mean reports 0.
fn dscr_statistics(dscr: &[Multiple]) -> (Option<Multiple>, Multiple) {
    let min = dscr.iter().copied().min();
    let avg = if dscr.is_empty() {
        Decimal::ZERO
    } else {
        dscr.iter().sum::<Decimal>() / Decimal::from(dscr.len() as i64)
    };
    (min, avg)
}

/// 1-based index of the first year where cumulative `flows` reach `threshold`.
fn first_year_reaching(flows: &[Money], threshold: Money) -> Option<u32> {
    flows
        .iter()
        .scan(Decimal::ZERO, |cumulative, cf| {
            *cumulative += cf;
            Some(*cumulative)
        })
        .position(|cumulative| cumulative >= threshold)
        .map(|i| i as u32 + 1)
}

/// LLCR over the years that start with debt outstanding.
fn loan_life_coverage(params: &ParameterSet, table: &CashflowTable) -> Option<Multiple> {
    let debt = params.debt_investment();
    if debt <= Decimal::ZERO {
        return None;
    }

    let loan_life_cfads: Vec<Money> = table
        .rows
        .iter()
        .take_while(|r| r.debt_balance_start > Decimal::ZERO)
        .map(|r| r.cfads)
        .collect();
    if loan_life_cfads.is_empty() {
        return None;
    }

    time_value::present_value(params.debt_rate, &loan_life_cfads)
        .ok()
        .and_then(|pv| pv.checked_div(debt))
}

/// Attribute a discounting failure to the parameter that drove it.
fn blame(field: ParameterField) -> impl Fn(PppFinanceError) -> PppFinanceError {
    move |e| match e {
        PppFinanceError::InvalidInput { reason, .. } => PppFinanceError::InvalidInput {
            field: field.to_string(),
            reason,
        },
        PppFinanceError::DivisionByZero { context } => PppFinanceError::InvalidInput {
            field: field.to_string(),
            reason: format!("Discount factor vanishes ({context})"),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cashflow;

    fn reference_kpis() -> KpiSummary {
        let params = ParameterSet::default();
        let table = cashflow::build(&params).unwrap();
        aggregate(&params, &table).unwrap()
    }

    #[test]
    fn test_reference_npv_matches_discounted_cfads() {
        let params = ParameterSet::default();
        let table = cashflow::build(&params).unwrap();
        let kpis = aggregate(&params, &table).unwrap();

        let mut expected = -params.total_investment;
        let mut discount = Decimal::ONE;
        for row in &table.rows {
            discount *= Decimal::ONE + params.discount_rate;
            expected += row.cfads / discount;
        }
        assert!((kpis.project_npv - expected).abs() < dec!(0.0001));
        assert_eq!(kpis.equity_npv, kpis.project_npv);
    }

    #[test]
    fn test_reference_irr_zeroes_npv() {
        let params = ParameterSet::default();
        let table = cashflow::build(&params).unwrap();
        let kpis = aggregate(&params, &table).unwrap();

        let irr = kpis.project_irr.expect("reference case IRR should converge");
        let mut flows = vec![-params.total_investment];
        flows.extend(table.cfads());
        let residual = time_value::npv(irr, &flows).unwrap();
        assert!(residual.abs() < dec!(0.001), "NPV at IRR = {residual}");
    }

    #[test]
    fn test_reference_dscr_statistics() {
        let kpis = reference_kpis();
        let min = kpis.min_dscr.unwrap();
        assert!(min > Decimal::ZERO);
        assert!(kpis.avg_dscr >= min);
        assert_eq!(kpis.debt_coverage, kpis.avg_dscr);
    }

    #[test]
    fn test_reference_payback_first_year() {
        // CFADS is positive from year one, so cumulative CFADS is >= 0 immediately
        let kpis = reference_kpis();
        assert_eq!(kpis.payback_period, Some(1));
        let conventional = kpis.investment_payback_period.unwrap();
        assert!(conventional > 1);
    }

    #[test]
    fn test_dscr_statistics_without_finite_values() {
        let (min, avg) = dscr_statistics(&[]);
        assert_eq!(min, None);
        assert_eq!(avg, Decimal::ZERO);
    }

    #[test]
    fn test_dscr_statistics_values() {
        let (min, avg) = dscr_statistics(&[dec!(1.5), dec!(1.2), dec!(1.8)]);
        assert_eq!(min, Some(dec!(1.2)));
        assert_eq!(avg, dec!(1.5));
    }

    #[test]
    fn test_first_year_reaching() {
        let flows = [dec!(-50), dec!(30), dec!(40), dec!(100)];
        assert_eq!(first_year_reaching(&flows, Decimal::ZERO), Some(3));
        assert_eq!(first_year_reaching(&flows, dec!(120)), Some(4));
        assert_eq!(first_year_reaching(&flows, dec!(1000)), None);
    }

    #[test]
    fn test_all_equity_project() {
        let params = ParameterSet {
            equity_ratio: Decimal::ONE,
            ..ParameterSet::default()
        };
        let table = cashflow::build(&params).unwrap();
        let kpis = aggregate(&params, &table).unwrap();

        assert_eq!(kpis.min_dscr, None);
        assert_eq!(kpis.avg_dscr, Decimal::ZERO);
        assert_eq!(kpis.llcr, None);
    }

    #[test]
    fn test_all_debt_project_has_zero_profitability_index() {
        let params = ParameterSet {
            equity_ratio: Decimal::ZERO,
            ..ParameterSet::default()
        };
        let table = cashflow::build(&params).unwrap();
        let kpis = aggregate(&params, &table).unwrap();
        assert_eq!(kpis.profitability_index, Decimal::ZERO);
    }

    #[test]
    fn test_profitability_index_uses_equity_investment() {
        let params = ParameterSet::default();
        let table = cashflow::build(&params).unwrap();
        let kpis = aggregate(&params, &table).unwrap();

        let pv = time_value::present_value(params.discount_rate, &table.cfads()).unwrap();
        assert!((kpis.profitability_index - pv / dec!(1500)).abs() < dec!(0.0000001));
        // NPV + investment is the PV of inflows
        assert!((pv - (kpis.project_npv + params.total_investment)).abs() < dec!(0.0001));
    }
}
