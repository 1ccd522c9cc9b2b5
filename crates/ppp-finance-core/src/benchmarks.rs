use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::cashflow::CashflowTable;
use crate::kpi::KpiSummary;
use crate::types::{Money, Multiple, Rate};

/// Lender and investor thresholds a projection is judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialBenchmarks {
    /// Lender covenant floor for DSCR
    pub min_dscr: Multiple,
    /// Comfortable DSCR level
    pub target_dscr: Multiple,
    /// Hurdle rate for the project IRR
    pub min_irr: Rate,
    /// Lowest acceptable project NPV
    pub acceptable_npv: Money,
}

impl Default for FinancialBenchmarks {
    fn default() -> Self {
        Self {
            min_dscr: dec!(1.25),
            target_dscr: dec!(1.50),
            min_irr: dec!(0.10),
            acceptable_npv: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DscrStatus {
    /// Minimum DSCR at or above target
    Healthy,
    /// Between the covenant floor and the target
    Adequate,
    /// Below the covenant floor in at least one year
    AtRisk,
    /// No year carries debt service
    NotApplicable,
}

impl std::fmt::Display for DscrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DscrStatus::Healthy => write!(f, "Healthy"),
            DscrStatus::Adequate => write!(f, "Adequate"),
            DscrStatus::AtRisk => write!(f, "At risk"),
            DscrStatus::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Outcome of checking a projection against [`FinancialBenchmarks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkAssessment {
    pub dscr_status: DscrStatus,
    /// Years whose DSCR falls below the covenant floor
    pub years_below_min_dscr: Vec<u32>,
    /// `None` when the IRR is unavailable
    pub irr_meets_hurdle: Option<bool>,
    pub npv_acceptable: bool,
}

impl BenchmarkAssessment {
    /// Human-readable findings for the warnings list.
    pub fn findings(&self, benchmarks: &FinancialBenchmarks) -> Vec<String> {
        let mut findings = Vec::new();

        if !self.years_below_min_dscr.is_empty() {
            let years: Vec<String> = self
                .years_below_min_dscr
                .iter()
                .map(u32::to_string)
                .collect();
            findings.push(format!(
                "DSCR below the {}x covenant floor in year(s) {}",
                benchmarks.min_dscr,
                years.join(", ")
            ));
        }
        if self.irr_meets_hurdle == Some(false) {
            findings.push(format!(
                "Project IRR is below the {} hurdle rate",
                benchmarks.min_irr
            ));
        }
        if !self.npv_acceptable {
            findings.push(format!(
                "Project NPV is below the acceptable level of {}",
                benchmarks.acceptable_npv
            ));
        }

        findings
    }
}

/// Classify a projection against lender and investor thresholds.
pub fn assess(
    table: &CashflowTable,
    kpis: &KpiSummary,
    benchmarks: &FinancialBenchmarks,
) -> BenchmarkAssessment {
    let dscr_status = match kpis.min_dscr {
        None => DscrStatus::NotApplicable,
        Some(min) if min >= benchmarks.target_dscr => DscrStatus::Healthy,
        Some(min) if min >= benchmarks.min_dscr => DscrStatus::Adequate,
        Some(_) => DscrStatus::AtRisk,
    };

    let years_below_min_dscr = table
        .rows
        .iter()
        .filter(|r| matches!(r.dscr, Some(d) if d < benchmarks.min_dscr))
        .map(|r| r.year)
        .collect();

    BenchmarkAssessment {
        dscr_status,
        years_below_min_dscr,
        irr_meets_hurdle: kpis.project_irr.map(|irr| irr >= benchmarks.min_irr),
        npv_acceptable: kpis.project_npv >= benchmarks.acceptable_npv,
    }
}
