use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::PppFinanceError;
use crate::types::{Money, Rate};
use crate::PppFinanceResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;

/// Bracket searched when Newton-Raphson fails. The upper bound keeps
/// (1+r)^t inside Decimal range for schedules of a few dozen years.
const IRR_LOWER_BOUND: Rate = dec!(-0.5);
const IRR_UPPER_BOUND: Rate = dec!(3.0);

/// Net Present Value of a series of cash flows.
///
/// The first flow sits at period 0 and is not discounted; flow `t` is
/// divided by `(1 + rate)^t`.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> PppFinanceResult<Money> {
    if rate <= dec!(-1) {
        return Err(PppFinanceError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut result = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| PppFinanceError::InvalidInput {
                    field: "rate".into(),
                    reason: format!("Discount factor overflows at period {t}"),
                })?;
        }
        if discount.is_zero() {
            return Err(PppFinanceError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| PppFinanceError::InvalidInput {
                field: "rate".into(),
                reason: format!("Discounted value overflows at period {t}"),
            })?;
    }

    Ok(result)
}

/// Present value of flows that start one period from now.
///
/// `flows[0]` is discounted once, `flows[1]` twice and so on.
pub fn present_value(rate: Rate, flows: &[Money]) -> PppFinanceResult<Money> {
    let mut shifted = Vec::with_capacity(flows.len() + 1);
    shifted.push(Decimal::ZERO);
    shifted.extend_from_slice(flows);
    npv(rate, &shifted)
}

/// Internal Rate of Return.
///
/// Newton-Raphson from `guess`, falling back to bisection over
/// [-50%, 300%] when the derivative vanishes, a step leaves Decimal range
/// or the iteration budget runs out.
pub fn irr(cash_flows: &[Money], guess: Rate) -> PppFinanceResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(PppFinanceError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !has_outflow || !has_inflow {
        return Err(PppFinanceError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: 0,
            last_delta: cash_flows.iter().sum(),
        });
    }

    match newton_raphson(cash_flows, guess) {
        Some(rate) => Ok(rate),
        None => bisection(cash_flows),
    }
}

fn newton_raphson(cash_flows: &[Money], guess: Rate) -> Option<Rate> {
    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_and_derivative(rate, cash_flows)?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Some(rate);
        }
        if dnpv.is_zero() {
            return None;
        }

        rate -= npv_val.checked_div(dnpv)?;

        // Guard against divergence
        if rate < IRR_LOWER_BOUND {
            rate = IRR_LOWER_BOUND;
        } else if rate > IRR_UPPER_BOUND {
            rate = IRR_UPPER_BOUND;
        }
    }

    None
}

fn bisection(cash_flows: &[Money]) -> PppFinanceResult<Rate> {
    let failure = |iterations: u32, last_delta: Decimal| PppFinanceError::ConvergenceFailure {
        function: "IRR".into(),
        iterations,
        last_delta,
    };

    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let mut f_lo = npv_checked(lo, cash_flows).ok_or_else(|| failure(0, Decimal::MAX))?;
    let f_hi = npv_checked(hi, cash_flows).ok_or_else(|| failure(0, Decimal::MAX))?;

    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return Err(failure(0, f_lo));
    }

    let mut mid = lo;
    let mut f_mid = f_lo;
    for i in 0..MAX_BISECTION_ITERATIONS {
        mid = (lo + hi) / dec!(2);
        f_mid = npv_checked(mid, cash_flows).ok_or_else(|| failure(i, f_mid))?;

        if f_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo).abs() < CONVERGENCE_THRESHOLD {
            return Ok(mid);
        }

        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(failure(MAX_BISECTION_ITERATIONS, npv_checked(mid, cash_flows).unwrap_or(f_mid)))
}

/// NPV with every step checked; `None` when a discount factor leaves range.
fn npv_checked(rate: Rate, cash_flows: &[Money]) -> Option<Money> {
    npv_and_derivative(rate, cash_flows).map(|(v, _)| v)
}

/// NPV and dNPV/dr via iterative discount factors (no powd).
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            return None;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let t_dec = Decimal::from(t as i64);
            let denom = discount.checked_mul(one_plus_r)?;
            dnpv = dnpv.checked_sub(t_dec.checked_mul(*cf)?.checked_div(denom)?)?;
        }
    }

    Some((npv_val, dnpv))
}
