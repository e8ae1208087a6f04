use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::DcfAssumptions;
use crate::scenario::Scenario;
use crate::types::{nz, with_metadata, ComputationOutput, Money};
use crate::ValuationResult;

/// Terminal-value denominator is floored at this magnitude so a WACC equal
/// to the perpetual growth rate yields a large finite value instead of a
/// division by zero.
const TERMINAL_DENOMINATOR_FLOOR: Decimal = dec!(0.000001);

const DEFAULT_TAX_RATE: Decimal = dec!(0.19);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One discounted forecast-year cash flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcfCashflow {
    pub year: i32,
    pub fcff: Money,
    pub discount_factor: Decimal,
    pub present_value: Money,
}

/// Full FCFF DCF result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcfResult {
    /// Sum of the discounted forecast-year cash flows.
    pub pv_cashflows: Money,
    pub terminal_value: Money,
    pub pv_terminal: Money,
    pub enterprise_value: Money,
    /// Net debt taken from the final forecast year.
    pub terminal_net_debt: Money,
    /// Enterprise value less terminal net debt, before the zero floor.
    pub raw_equity: Money,
    /// `max(raw_equity, 0)`.
    pub equity_value: Money,
    pub cashflows: Vec<DcfCashflow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value a computed scenario with a free-cash-flow-to-firm DCF.
///
/// Forecast years are the years after the last historical year (all years,
/// if the scenario has no historical data). EBIT and the working-capital
/// change prefer the projector's outputs and fall back to recomputing from
/// inputs, so a scenario assembled by hand values the same way as a
/// projected one; FCFF itself is always rebuilt with this valuation's tax
/// rate.
pub fn calculate_dcf_fcff(
    scenario: &Scenario,
    params: &DcfAssumptions,
) -> ValuationResult<ComputationOutput<DcfResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let tax_rate = params.tax_rate.unwrap_or(DEFAULT_TAX_RATE);
    let after_tax = Decimal::ONE - tax_rate;
    let discount_base = Decimal::ONE + params.wacc;

    let last_historical = scenario
        .iter()
        .filter(|(_, sy)| sy.is_historical())
        .map(|(&year, _)| year)
        .next_back();

    let forecast_years: Vec<i32> = scenario
        .keys()
        .copied()
        .filter(|year| last_historical.map_or(true, |last| *year > last))
        .collect();

    // Seed the NWC accumulator from the last historical year so the first
    // forecast year's working-capital change is measured against it.
    let mut prev_nwc: Option<Decimal> = last_historical
        .and_then(|year| scenario.get(&year))
        .filter(|sy| sy.inputs.has_working_capital())
        .map(|sy| sy.inputs.net_working_capital());

    let mut cashflows: Vec<DcfCashflow> = Vec::with_capacity(forecast_years.len());
    let mut pv_cashflows = Decimal::ZERO;
    let mut last_fcff = Decimal::ZERO;

    for (idx, &year) in forecast_years.iter().enumerate() {
        let Some(sy) = scenario.get(&year) else {
            continue;
        };
        let inputs = &sy.inputs;
        let outputs = &sy.outputs;

        let depr = nz(inputs.depr);
        let capex = nz(inputs.capex);

        let ebit = match outputs.ebit {
            Some(e) if !e.is_zero() => e,
            _ => nz(inputs.revenues) - nz(inputs.cogs) - nz(inputs.sgna),
        };

        let nwc = inputs.net_working_capital();
        let nwc_change = match outputs.nwc_change {
            Some(d) => d,
            None => prev_nwc.map(|p| nwc - p).unwrap_or(Decimal::ZERO),
        };
        prev_nwc = Some(nwc);

        // FCFF is always rebuilt here so the valuator's tax rate applies
        // even when the projector ran with a different one.
        let fcff = ebit * after_tax + depr - capex - nwc_change;

        let t = idx as i64 + 1;
        let discount_factor = Decimal::ONE
            .checked_div(discount_base.powi(t))
            .unwrap_or(Decimal::ZERO);
        let present_value = fcff * discount_factor;

        pv_cashflows += present_value;
        last_fcff = fcff;
        cashflows.push(DcfCashflow {
            year,
            fcff,
            discount_factor,
            present_value,
        });
    }

    let (terminal_value, pv_terminal) = if cashflows.is_empty() {
        warnings.push("no forecast years to discount; valuation is zero".to_string());
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let denominator =
            safe_terminal_denominator(params.wacc - params.perpetual_growth, &mut warnings);
        let tv = last_fcff * (Decimal::ONE + params.perpetual_growth) / denominator;
        let pv = tv
            .checked_div(discount_base.powi(cashflows.len() as i64))
            .unwrap_or(Decimal::ZERO);
        (tv, pv)
    };

    let enterprise_value = pv_cashflows + pv_terminal;

    let terminal_net_debt = forecast_years
        .last()
        .and_then(|year| scenario.get(year))
        .and_then(|sy| sy.inputs.net_debt.or(sy.inputs.debt))
        .unwrap_or(Decimal::ZERO);

    let raw_equity = enterprise_value - terminal_net_debt;
    let equity_value = raw_equity.max(Decimal::ZERO);

    let result = DcfResult {
        pv_cashflows,
        terminal_value,
        pv_terminal,
        enterprise_value,
        terminal_net_debt,
        raw_equity,
        equity_value,
        cashflows,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "FCFF discounted cash flow with Gordon growth terminal value",
        params,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Floor `wacc − g` at ±1e-6, preserving sign; an exact zero spread is
/// treated as positive.
fn safe_terminal_denominator(spread: Decimal, warnings: &mut Vec<String>) -> Decimal {
    if spread.abs() >= TERMINAL_DENOMINATOR_FLOOR {
        return spread;
    }
    warnings.push(
        "WACC is within 1e-6 of perpetual growth; terminal denominator floored".to_string(),
    );
    if spread.is_sign_negative() && !spread.is_zero() {
        -TERMINAL_DENOMINATOR_FLOOR
    } else {
        TERMINAL_DENOMINATOR_FLOOR
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
