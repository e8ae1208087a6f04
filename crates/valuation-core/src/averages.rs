use rust_decimal::{Decimal, MathematicalOps};
use std::time::Instant;

use crate::assumptions::{
    clamp_days, clamp_growth, clamp_pct, ModelAssumptions, ResolvedAssumptions, DAYS_IN_YEAR,
};
use crate::scenario::Scenario;
use crate::types::{with_metadata, ComputationOutput};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive a default assumption set from the observed ratios of a computed
/// scenario's historical years (oldest → newest).
///
/// Simple ratios (COGS, SG&A, capex, working-capital lines over revenue)
/// are arithmetic means across years with usable revenue. Depreciation-
/// on-PPE and interest rate are pairwise against the prior year's balance
/// and need at least two years. Revenue growth is the geometric mean of
/// period-over-period ratios. Any metric without a single eligible sample
/// falls back to the static default, and an empty year list returns the
/// full default set unchanged.
pub fn compute_historical_averages(
    scenario: &Scenario,
    hist_years: &[i32],
    defaults: &ResolvedAssumptions,
) -> ValuationResult<ComputationOutput<ModelAssumptions>> {
    let start = Instant::now();

    let assumptions = if hist_years.is_empty() {
        defaults.as_assumptions()
    } else {
        derive_assumptions(scenario, hist_years, defaults)
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Historical ratio averaging",
        &serde_json::json!({ "historical_years": hist_years }),
        Vec::new(),
        elapsed,
        assumptions,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn derive_assumptions(
    scenario: &Scenario,
    hist_years: &[i32],
    defaults: &ResolvedAssumptions,
) -> ModelAssumptions {
    let mut revenues_series: Vec<Decimal> = Vec::new();
    let mut cogs_ratios: Vec<Decimal> = Vec::new();
    let mut sgna_ratios: Vec<Decimal> = Vec::new();
    let mut capex_ratios: Vec<Decimal> = Vec::new();
    let mut receivables_ratios: Vec<Decimal> = Vec::new();
    let mut inventory_ratios: Vec<Decimal> = Vec::new();
    let mut payables_ratios: Vec<Decimal> = Vec::new();
    let mut depr_ratios: Vec<Decimal> = Vec::new();
    let mut fin_exp_ratios: Vec<Decimal> = Vec::new();
    let mut dso_samples: Vec<Decimal> = Vec::new();
    let mut dio_samples: Vec<Decimal> = Vec::new();
    let mut dpo_samples: Vec<Decimal> = Vec::new();

    for &year in hist_years {
        let Some(sy) = scenario.get(&year) else {
            continue;
        };
        let inputs = &sy.inputs;
        let Some(revenues) = inputs.revenues else {
            continue;
        };
        revenues_series.push(revenues);

        // COGS-denominated day counts only need COGS, so they are
        // sampled even when revenue is zero.
        if let Some(cogs) = inputs.cogs {
            if !cogs.is_zero() {
                if let Some(inventory) = inputs.inventory {
                    dio_samples.push(inventory * DAYS_IN_YEAR / cogs);
                }
                if let Some(payables) = inputs.payables {
                    dpo_samples.push(payables * DAYS_IN_YEAR / cogs);
                }
            }
        }

        if revenues.is_zero() {
            // revenue is unusable as a denominator this year
            continue;
        }

        push_ratio(&mut cogs_ratios, inputs.cogs, revenues);
        push_ratio(&mut sgna_ratios, inputs.sgna, revenues);
        push_ratio(&mut capex_ratios, inputs.capex, revenues);
        push_ratio(&mut receivables_ratios, inputs.receivables, revenues);
        push_ratio(&mut inventory_ratios, inputs.inventory, revenues);
        push_ratio(&mut payables_ratios, inputs.payables, revenues);
        push_ratio(&mut depr_ratios, inputs.depr, revenues);
        push_ratio(&mut fin_exp_ratios, inputs.financial_expense, revenues);

        if let Some(receivables) = inputs.receivables {
            dso_samples.push(receivables * DAYS_IN_YEAR / revenues);
        }
    }

    // Pairwise metrics need the prior year's balance as denominator.
    let mut depr_on_ppe_ratios: Vec<Decimal> = Vec::new();
    let mut interest_ratios: Vec<Decimal> = Vec::new();

    for pair in hist_years.windows(2) {
        let (Some(prev), Some(cur)) = (scenario.get(&pair[0]), scenario.get(&pair[1])) else {
            continue;
        };
        let prev_inputs = &prev.inputs;
        let inputs = &cur.inputs;

        if let (Some(depr), Some(prev_ppe)) = (inputs.depr, prev_inputs.ppe) {
            if !prev_ppe.is_zero() {
                depr_on_ppe_ratios.push(depr / prev_ppe);
            }
        }

        let prev_net_debt = prev_inputs.net_debt.or(prev_inputs.debt);
        if let (Some(fin_exp), Some(net_debt)) = (inputs.financial_expense, prev_net_debt) {
            if !net_debt.is_zero() {
                interest_ratios.push(fin_exp / net_debt);
            }
        }
    }

    ModelAssumptions {
        revenue_growth_multiplier: Some(clamp_growth(
            geometric_mean_growth(&revenues_series)
                .unwrap_or(defaults.revenue_growth_multiplier),
        )),
        forecast_years: Some(defaults.forecast_years),
        cogs_pct: Some(clamp_pct(mean(&cogs_ratios).unwrap_or(defaults.cogs_pct))),
        sgna_pct: Some(clamp_pct(mean(&sgna_ratios).unwrap_or(defaults.sgna_pct))),
        capex_pct: Some(clamp_pct(mean(&capex_ratios).unwrap_or(defaults.capex_pct))),
        depr_on_ppe_pct: Some(
            mean(&depr_on_ppe_ratios)
                .map(clamp_pct)
                .unwrap_or(defaults.depr_on_ppe_pct),
        ),
        depr_pct: Some(clamp_pct(mean(&depr_ratios).unwrap_or(defaults.depr_pct))),
        interest_rate: Some(
            mean(&interest_ratios)
                .map(clamp_pct)
                .unwrap_or(defaults.interest_rate),
        ),
        fin_exp_pct: Some(clamp_pct(
            mean(&fin_exp_ratios).unwrap_or(defaults.fin_exp_pct),
        )),
        receivables_pct: Some(clamp_pct(
            mean(&receivables_ratios).unwrap_or(defaults.receivables_pct),
        )),
        inventory_pct: Some(clamp_pct(
            mean(&inventory_ratios).unwrap_or(defaults.inventory_pct),
        )),
        payables_pct: Some(clamp_pct(
            mean(&payables_ratios).unwrap_or(defaults.payables_pct),
        )),
        receivables_days: Some(clamp_days(
            mean(&dso_samples).unwrap_or(defaults.receivables_days),
        )),
        inventory_days: Some(clamp_days(
            mean(&dio_samples).unwrap_or(defaults.inventory_days),
        )),
        payables_days: Some(clamp_days(
            mean(&dpo_samples).unwrap_or(defaults.payables_days),
        )),
        // fallback-only parameters stay on their table values
        net_debt_pct: Some(defaults.net_debt_pct),
        balance_growth_pct: Some(defaults.balance_growth_pct),
        tax_rate: Some(defaults.tax_rate),
    }
}

fn push_ratio(acc: &mut Vec<Decimal>, numerator: Option<Decimal>, denominator: Decimal) {
    if let Some(n) = numerator {
        if let Some(ratio) = n.checked_div(denominator) {
            acc.push(ratio);
        }
    }
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        None
    } else {
        let sum: Decimal = values.iter().copied().sum();
        Some(sum / Decimal::from(values.len() as u64))
    }
}

/// Geometric mean of period-over-period revenue ratios; `None` without at
/// least two usable revenue points. Zero-denominator periods are skipped,
/// as are sign-flipping ratios (the Decimal log is only defined for
/// positive values).
fn geometric_mean_growth(revenues: &[Decimal]) -> Option<Decimal> {
    if revenues.len() < 2 {
        return None;
    }
    let mut ratios: Vec<Decimal> = Vec::new();
    for pair in revenues.windows(2) {
        if pair[0].is_zero() {
            continue;
        }
        let ratio = pair[1] / pair[0];
        if ratio > Decimal::ZERO {
            ratios.push(ratio);
        }
    }
    match ratios.len() {
        0 => None,
        // a single ratio needs no root and stays exact
        1 => Some(ratios[0]),
        n => {
            let log_sum: Decimal = ratios.iter().map(|r| r.ln()).sum();
            Some((log_sum / Decimal::from(n as u64)).exp())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{ScenarioYear, YearInputs};
    use rust_decimal_macros::dec;

    fn year(inputs: YearInputs) -> ScenarioYear {
        ScenarioYear {
            inputs,
            ..ScenarioYear::default()
        }
    }

    fn defaults() -> ResolvedAssumptions {
        ResolvedAssumptions::default()
    }

    #[test]
    fn test_empty_year_list_returns_static_defaults() {
        let out =
            compute_historical_averages(&Scenario::new(), &[], &defaults()).unwrap();
        assert_eq!(out.result, defaults().as_assumptions());
    }

    #[test]
    fn test_single_year_ratios_and_pairwise_fallbacks() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(1000)),
                cogs: Some(dec!(600)),
                sgna: Some(dec!(150)),
                capex: Some(dec!(40)),
                receivables: Some(dec!(100)),
                ..YearInputs::default()
            }),
        );
        let out = compute_historical_averages(&scenario, &[2023], &defaults()).unwrap();
        let a = &out.result;

        assert_eq!(a.cogs_pct, Some(dec!(0.6)));
        assert_eq!(a.sgna_pct, Some(dec!(0.15)));
        assert_eq!(a.capex_pct, Some(dec!(0.04)));
        // DSO = 100 * 365 / 1000
        assert_eq!(a.receivables_days, Some(dec!(36.5)));

        // pairwise metrics need two years: static defaults apply
        assert_eq!(a.revenue_growth_multiplier, Some(dec!(1.05)));
        assert_eq!(a.depr_on_ppe_pct, Some(dec!(0.08)));
        assert_eq!(a.interest_rate, Some(dec!(0.05)));
    }

    #[test]
    fn test_revenue_doubling_gives_exact_multiplier() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2022,
            year(YearInputs {
                revenues: Some(dec!(100)),
                ..YearInputs::default()
            }),
        );
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(200)),
                ..YearInputs::default()
            }),
        );
        let out =
            compute_historical_averages(&scenario, &[2022, 2023], &defaults()).unwrap();
        assert_eq!(out.result.revenue_growth_multiplier, Some(dec!(2.0)));
    }

    #[test]
    fn test_growth_skips_zero_denominator_periods() {
        let mut scenario = Scenario::new();
        for (y, rev) in [(2021, dec!(100)), (2022, dec!(0)), (2023, dec!(150))] {
            scenario.insert(
                y,
                year(YearInputs {
                    revenues: Some(rev),
                    ..YearInputs::default()
                }),
            );
        }
        let out =
            compute_historical_averages(&scenario, &[2021, 2022, 2023], &defaults()).unwrap();
        // 100 -> 0 yields a non-positive ratio and 0 -> 150 has no usable
        // denominator, so no samples remain and the default applies
        assert_eq!(out.result.revenue_growth_multiplier, Some(dec!(1.05)));
    }

    #[test]
    fn test_pairwise_depreciation_and_interest() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2022,
            year(YearInputs {
                revenues: Some(dec!(1000)),
                ppe: Some(dec!(400)),
                net_debt: Some(dec!(200)),
                ..YearInputs::default()
            }),
        );
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(1100)),
                depr: Some(dec!(32)),
                financial_expense: Some(dec!(12)),
                ..YearInputs::default()
            }),
        );
        let out =
            compute_historical_averages(&scenario, &[2022, 2023], &defaults()).unwrap();
        // 32 / 400 and 12 / 200
        assert_eq!(out.result.depr_on_ppe_pct, Some(dec!(0.08)));
        assert_eq!(out.result.interest_rate, Some(dec!(0.06)));
    }

    #[test]
    fn test_pairwise_skips_zero_balances() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2022,
            year(YearInputs {
                revenues: Some(dec!(1000)),
                ppe: Some(dec!(0)),
                net_debt: Some(dec!(0)),
                ..YearInputs::default()
            }),
        );
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(1100)),
                depr: Some(dec!(32)),
                financial_expense: Some(dec!(12)),
                ..YearInputs::default()
            }),
        );
        let out =
            compute_historical_averages(&scenario, &[2022, 2023], &defaults()).unwrap();
        assert_eq!(out.result.depr_on_ppe_pct, Some(dec!(0.08)));
        assert_eq!(out.result.interest_rate, Some(dec!(0.05)));
    }

    #[test]
    fn test_zero_revenue_year_excluded_from_ratios() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2022,
            year(YearInputs {
                revenues: Some(dec!(0)),
                cogs: Some(dec!(999)),
                ..YearInputs::default()
            }),
        );
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(1000)),
                cogs: Some(dec!(700)),
                ..YearInputs::default()
            }),
        );
        let out =
            compute_historical_averages(&scenario, &[2022, 2023], &defaults()).unwrap();
        // only 2023 contributes
        assert_eq!(out.result.cogs_pct, Some(dec!(0.7)));
    }

    #[test]
    fn test_ratios_clamped_to_unit_interval() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(100)),
                cogs: Some(dec!(250)),
                ..YearInputs::default()
            }),
        );
        let out = compute_historical_averages(&scenario, &[2023], &defaults()).unwrap();
        assert_eq!(out.result.cogs_pct, Some(Decimal::ONE));
    }

    #[test]
    fn test_dio_dpo_require_nonzero_cogs() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(1000)),
                cogs: Some(dec!(0)),
                inventory: Some(dec!(80)),
                payables: Some(dec!(60)),
                ..YearInputs::default()
            }),
        );
        let out = compute_historical_averages(&scenario, &[2023], &defaults()).unwrap();
        // no DIO/DPO samples: defaults apply
        assert_eq!(out.result.inventory_days, Some(dec!(29.2)));
        assert_eq!(out.result.payables_days, Some(dec!(21.9)));
    }

    #[test]
    fn test_dio_dpo_sampled_in_zero_revenue_year() {
        let mut scenario = Scenario::new();
        scenario.insert(
            2023,
            year(YearInputs {
                revenues: Some(dec!(0)),
                cogs: Some(dec!(600)),
                inventory: Some(dec!(80)),
                payables: Some(dec!(60)),
                ..YearInputs::default()
            }),
        );
        let out = compute_historical_averages(&scenario, &[2023], &defaults()).unwrap();
        // DIO/DPO depend on COGS only, so a dormant-revenue year still
        // contributes; DSO has no denominator and stays on the default
        assert_eq!(
            out.result.inventory_days,
            Some(dec!(80) * DAYS_IN_YEAR / dec!(600))
        );
        assert_eq!(out.result.payables_days, Some(dec!(36.5)));
        assert_eq!(out.result.receivables_days, Some(dec!(36.5)));
    }
}
