//! Corporate tax with loss carryforward.
//!
//! Tax is a left fold over the EBT series in year order. The accumulator is
//! the carried loss balance, which is never negative. Losses carry forward
//! indefinitely and never backward.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

/// How carried losses interact with later years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarryforwardRule {
    /// The loss drawn in a year is `min(balance, max(0, -EBT))`. Draws only
    /// occur in deficit years, so profitable years are taxed in full and the
    /// balance only grows.
    #[default]
    DeficitYearsOnly,
    /// Conventional relief: the balance offsets taxable profit in later
    /// profitable years until exhausted.
    OffsetProfits,
}

/// Carried loss balance between years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LossCarryforward {
    pub cumulative_loss: Money,
}

/// Tax outcome for one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYear {
    pub ebt: Money,
    pub loss_used: Money,
    pub taxable_income: Money,
    pub tax: Money,
    /// Balance carried into the next year
    pub loss_balance: Money,
}

/// Full tax schedule for a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSchedule {
    pub years: Vec<TaxYear>,
    /// Balance left after the final year
    pub unused_losses: Money,
}

impl LossCarryforward {
    /// Tax one year and return the balance to carry into the next.
    pub fn step(self, ebt: Money, tax_rate: Rate, rule: CarryforwardRule) -> (Self, TaxYear) {
        let loss_used = match rule {
            CarryforwardRule::DeficitYearsOnly => self.cumulative_loss.min((-ebt).max(Decimal::ZERO)),
            CarryforwardRule::OffsetProfits => self.cumulative_loss.min(ebt.max(Decimal::ZERO)),
        };

        let taxable_income = match rule {
            CarryforwardRule::DeficitYearsOnly => (ebt + loss_used).max(Decimal::ZERO),
            CarryforwardRule::OffsetProfits => (ebt - loss_used).max(Decimal::ZERO),
        };
        let tax = (taxable_income * tax_rate).max(Decimal::ZERO);

        let cumulative_loss = if ebt < Decimal::ZERO {
            self.cumulative_loss + ebt.abs()
        } else {
            self.cumulative_loss - loss_used
        };

        let next = LossCarryforward { cumulative_loss };
        let year = TaxYear {
            ebt,
            loss_used,
            taxable_income,
            tax,
            loss_balance: cumulative_loss,
        };
        (next, year)
    }
}

/// Compute taxable income and tax for an EBT series in year order.
pub fn compute_taxes(ebt: &[Money], tax_rate: Rate, rule: CarryforwardRule) -> TaxSchedule {
    let (state, years) = ebt.iter().fold(
        (LossCarryforward::default(), Vec::with_capacity(ebt.len())),
        |(state, mut years), &year_ebt| {
            let (next, year) = state.step(year_ebt, tax_rate, rule);
            years.push(year);
            (next, years)
        },
    );

    TaxSchedule {
        years,
        unused_losses: state.cumulative_loss,
    }
}
