use rust_decimal::Decimal;
use std::time::Instant;

use crate::assumptions::{ModelAssumptions, ResolvedAssumptions, DAYS_IN_YEAR};
use crate::rollforward::{forecast_net_debt, next_ppe, NetDebtInputs};
use crate::scenario::{DebtComponents, RawStatementYear, Scenario, ScenarioYear, YearInputs, YearOutputs};
use crate::types::{nz, with_metadata, ComputationOutput};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute a full scenario from normalized historical years: first derive
/// outputs for every supplied year (the historical pass), then append
/// forecast years driven by the resolved assumption set.
///
/// Both passes walk years in ascending order and thread an explicit
/// running state (previous NWC, net debt, PPE, cash, gross debt) from one
/// year to the next; that ordering is intrinsic to the model.
pub fn compute_scenario(
    raw: &Scenario,
    params: &ModelAssumptions,
    defaults: &ResolvedAssumptions,
) -> ValuationResult<ComputationOutput<Scenario>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let cfg = params.resolve(defaults);

    let mut computed = Scenario::new();

    // -- Historical pass -------------------------------------------------
    let mut prev_nwc = Decimal::ZERO;
    let mut prev_net_debt = Decimal::ZERO;

    for (idx, (&year, sy)) in raw.iter().enumerate() {
        let inputs = &sy.inputs;

        let revenues = nz(inputs.revenues);
        let cogs = nz(inputs.cogs);
        let sgna = nz(inputs.sgna);
        let depr = nz(inputs.depr);

        let gross_profit = revenues - cogs;
        let ebit = gross_profit - sgna;

        // Net debt precedence: explicit input, then a debt-components
        // total, then zero.
        let net_debt_here = inputs
            .net_debt
            .or_else(|| {
                inputs
                    .debt_components
                    .as_ref()
                    .and_then(DebtComponents::total)
            })
            .unwrap_or(Decimal::ZERO);

        // The first year has no predecessor; its own net debt stands in.
        let prior_net_debt = if idx == 0 { net_debt_here } else { prev_net_debt };

        // Prefer the reported figure; a missing or zero reading falls
        // back to an estimate off the prior net debt.
        let financial_expense = match inputs.financial_expense {
            Some(fe) if !fe.is_zero() => fe,
            _ => prior_net_debt * cfg.interest_rate,
        };

        let net_income = (ebit - financial_expense) * (Decimal::ONE - cfg.tax_rate);

        let nwc = inputs.net_working_capital();
        let nwc_change = nwc - prev_nwc;
        let operating_cf = net_income + depr - nwc_change;

        let capex = nz(inputs.capex);
        let nopat = ebit * (Decimal::ONE - cfg.tax_rate);
        let fcff = nopat + depr - capex - nwc_change;

        let mut year_inputs = inputs.clone();
        year_inputs.net_debt = Some(net_debt_here);

        computed.insert(
            year,
            ScenarioYear {
                raw: sy.raw.clone(),
                inputs: year_inputs,
                outputs: YearOutputs {
                    gross_profit: Some(gross_profit),
                    ebit: Some(ebit),
                    financial_expense: Some(financial_expense),
                    net_income: Some(net_income),
                    operating_cf: Some(operating_cf),
                    nwc_change: Some(nwc_change),
                    fcff: Some(fcff),
                    cash: None,
                },
            },
        );

        prev_nwc = nwc;
        prev_net_debt = net_debt_here;
    }

    // -- Forecast pass ---------------------------------------------------
    // prev_nwc carries the last historical year's NWC into the first
    // forecast year.
    if let Some(&last_year) = raw.keys().next_back() {
        for i in 1..=cfg.forecast_years as i32 {
            let year = last_year + i;
            let Some(prev) = computed.get(&(year - 1)).cloned() else {
                warnings.push(format!(
                    "forecast halted at {year}: predecessor year {} is missing",
                    year - 1
                ));
                break;
            };
            let prev_inputs = prev.inputs;

            let revenues = nz(prev_inputs.revenues) * cfg.revenue_growth_multiplier;
            let cogs = revenues * cfg.cogs_pct;
            let sgna = revenues * cfg.sgna_pct;
            let capex = revenues * cfg.capex_pct;

            // PPE-based depreciation whenever that percentage is set;
            // the revenue-based rate is the legacy fallback.
            let depr = if cfg.depr_on_ppe_pct > Decimal::ZERO {
                nz(prev_inputs.ppe) * cfg.depr_on_ppe_pct
            } else {
                revenues * cfg.depr_pct
            };
            let ppe = next_ppe(prev_inputs.ppe, capex, depr);

            // Day-count working capital; DIO/DPO lose their denominator
            // when COGS is zero and revert to percent-of-revenue.
            let receivables = revenues * cfg.receivables_days / DAYS_IN_YEAR;
            let inventory = if cogs.is_zero() {
                revenues * cfg.inventory_pct
            } else {
                cogs * cfg.inventory_days / DAYS_IN_YEAR
            };
            let payables = if cogs.is_zero() {
                revenues * cfg.payables_pct
            } else {
                cogs * cfg.payables_days / DAYS_IN_YEAR
            };

            let nwc = receivables + inventory - payables;
            let nwc_change = nwc - prev_nwc;

            let net_debt = forecast_net_debt(&NetDebtInputs {
                prev_debt: prev_inputs.debt,
                prev_cash: prev_inputs.cash,
                revenues,
                balance_growth_pct: cfg.balance_growth_pct,
                net_debt_pct_fallback: cfg.net_debt_pct,
            });

            let prior_net_debt = prev_inputs
                .net_debt
                .or(prev_inputs.debt)
                .unwrap_or(Decimal::ZERO);
            let financial_expense = if cfg.interest_rate > Decimal::ZERO {
                prior_net_debt * cfg.interest_rate
            } else {
                revenues * cfg.fin_exp_pct
            };

            let gross_profit = revenues - cogs;
            let ebit = gross_profit - sgna;
            let net_income = (ebit - financial_expense) * (Decimal::ONE - cfg.tax_rate);

            let operating_cf = net_income + depr - nwc_change;
            let nopat = ebit * (Decimal::ONE - cfg.tax_rate);
            let fcff = nopat + depr - capex - nwc_change;

            // Gross debt rollforward: grow a known prior gross debt,
            // otherwise approximate gross = net debt + beginning cash.
            let prev_gross_debt = match (prev_inputs.debt, prev_inputs.net_debt, prev_inputs.cash)
            {
                (Some(debt), _, _) => debt,
                (None, Some(nd), Some(cash)) => nd + cash,
                _ => Decimal::ZERO,
            };
            let gross_debt_forecast = if prev_inputs.debt.is_some() {
                prev_gross_debt * (Decimal::ONE + cfg.balance_growth_pct)
            } else {
                net_debt + nz(prev_inputs.cash)
            };
            let delta_gross_debt = gross_debt_forecast - prev_gross_debt;

            let cash_begin = nz(prev_inputs.cash);
            let cash_end = cash_begin + operating_cf - capex + delta_gross_debt;

            computed.insert(
                year,
                ScenarioYear {
                    raw: RawStatementYear::default(),
                    inputs: YearInputs {
                        revenues: Some(revenues),
                        cogs: Some(cogs),
                        sgna: Some(sgna),
                        depr: Some(depr),
                        financial_expense: Some(financial_expense),
                        capex: Some(capex),
                        ppe: Some(ppe),
                        receivables: Some(receivables),
                        inventory: Some(inventory),
                        payables: Some(payables),
                        cash: Some(cash_end),
                        net_debt: Some(net_debt),
                        debt: prev_inputs.debt,
                        ..YearInputs::default()
                    },
                    outputs: YearOutputs {
                        gross_profit: Some(gross_profit),
                        ebit: Some(ebit),
                        financial_expense: None,
                        net_income: Some(net_income),
                        operating_cf: Some(operating_cf),
                        nwc_change: Some(nwc_change),
                        fcff: Some(fcff),
                        cash: Some(cash_begin),
                    },
                },
            );

            prev_nwc = nwc;
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Driver-based statement projection",
        &cfg,
        warnings,
        elapsed,
        computed,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn defaults() -> ResolvedAssumptions {
        ResolvedAssumptions::default()
    }

    /// One historical year matching the reference end-to-end case.
    fn base_year() -> ScenarioYear {
        let mut year = ScenarioYear {
            inputs: YearInputs {
                revenues: Some(dec!(1000)),
                cogs: Some(dec!(600)),
                sgna: Some(dec!(150)),
                depr: Some(dec!(50)),
                capex: Some(dec!(40)),
                receivables: Some(dec!(100)),
                inventory: Some(dec!(80)),
                payables: Some(dec!(60)),
                net_debt: Some(dec!(200)),
                ppe: Some(dec!(400)),
                ..YearInputs::default()
            },
            ..ScenarioYear::default()
        };
        year.raw
            .income_statement
            .insert("revenues".into(), json!(1000));
        year
    }

    fn base_scenario() -> Scenario {
        let mut scenario = Scenario::new();
        scenario.insert(2023, base_year());
        scenario
    }

    fn base_params() -> ModelAssumptions {
        ModelAssumptions {
            revenue_growth_multiplier: Some(dec!(1.05)),
            forecast_years: Some(1),
            cogs_pct: Some(dec!(0.6)),
            sgna_pct: Some(dec!(0.15)),
            capex_pct: Some(dec!(0.05)),
            depr_on_ppe_pct: Some(dec!(0.08)),
            interest_rate: Some(dec!(0.05)),
            tax_rate: Some(dec!(0.19)),
            ..ModelAssumptions::default()
        }
    }

    #[test]
    fn test_historical_profit_identities() {
        let out = compute_scenario(&base_scenario(), &base_params(), &defaults()).unwrap();
        let year = &out.result[&2023];
        // grossProfit = revenues - cogs, ebit = grossProfit - sgna
        assert_eq!(year.outputs.gross_profit, Some(dec!(400)));
        assert_eq!(year.outputs.ebit, Some(dec!(250)));
        // first historical year: dNWC = NWC - 0
        assert_eq!(year.outputs.nwc_change, Some(dec!(120)));
    }

    #[test]
    fn test_historical_financial_expense_estimated_from_net_debt() {
        let out = compute_scenario(&base_scenario(), &base_params(), &defaults()).unwrap();
        let year = &out.result[&2023];
        // no reported expense: first year estimates off its own net debt
        assert_eq!(year.outputs.financial_expense, Some(dec!(10.00)));
        // net_income = (250 - 10) * 0.81
        assert_eq!(year.outputs.net_income, Some(dec!(194.4000)));
    }

    #[test]
    fn test_historical_reported_financial_expense_preferred() {
        let mut scenario = base_scenario();
        scenario.get_mut(&2023).unwrap().inputs.financial_expense = Some(dec!(25));
        let out = compute_scenario(&scenario, &base_params(), &defaults()).unwrap();
        assert_eq!(
            out.result[&2023].outputs.financial_expense,
            Some(dec!(25))
        );
    }

    #[test]
    fn test_historical_fcff() {
        let out = compute_scenario(&base_scenario(), &base_params(), &defaults()).unwrap();
        let year = &out.result[&2023];
        // NOPAT = 250 * 0.81 = 202.5; FCFF = 202.5 + 50 - 40 - 120
        assert_eq!(year.outputs.fcff, Some(dec!(92.5000)));
    }

    #[test]
    fn test_forecast_reference_year() {
        let out = compute_scenario(&base_scenario(), &base_params(), &defaults()).unwrap();
        let forecast = &out.result[&2024];
        assert!(!forecast.is_historical());

        let inputs = &forecast.inputs;
        assert_eq!(inputs.revenues, Some(dec!(1050.00)));
        assert_eq!(inputs.cogs, Some(dec!(630.000)));
        assert_eq!(inputs.sgna, Some(dec!(157.5000)));
        // ebit = 1050 - 630 - 157.5
        assert_eq!(forecast.outputs.ebit, Some(dec!(262.5000)));
        assert!(forecast.outputs.fcff.is_some());
    }

    #[test]
    fn test_forecast_ppe_rollforward() {
        let out = compute_scenario(&base_scenario(), &base_params(), &defaults()).unwrap();
        let forecast = &out.result[&2024];
        let capex = forecast.inputs.capex.unwrap();
        let depr = forecast.inputs.depr.unwrap();
        // depr = 8% of prior PPE (400) = 32
        assert_eq!(depr, dec!(32.00));
        assert_eq!(forecast.inputs.ppe, Some(dec!(400) + capex - depr));
    }

    #[test]
    fn test_forecast_day_count_working_capital() {
        let out = compute_scenario(&base_scenario(), &base_params(), &defaults()).unwrap();
        let inputs = &out.result[&2024].inputs;
        // DSO 36.5: receivables = 1050 * 36.5 / 365 = 105
        assert_eq!(inputs.receivables, Some(dec!(105.000)));
        // DIO 29.2 on COGS 630 = 50.4
        assert_eq!(inputs.inventory, Some(dec!(50.400)));
        // DPO 21.9 on COGS 630 = 37.8
        assert_eq!(inputs.payables, Some(dec!(37.800)));
    }

    #[test]
    fn test_forecast_percentage_fallback_when_cogs_zero() {
        let mut scenario = base_scenario();
        {
            let year = scenario.get_mut(&2023).unwrap();
            year.inputs.cogs = Some(dec!(0));
        }
        let params = ModelAssumptions {
            cogs_pct: Some(dec!(0)),
            ..base_params()
        };
        let out = compute_scenario(&scenario, &params, &defaults()).unwrap();
        let inputs = &out.result[&2024].inputs;
        // inventory falls back to 8% of revenues, payables to 6%
        assert_eq!(inputs.inventory, Some(dec!(84.0000)));
        assert_eq!(inputs.payables, Some(dec!(63.0000)));
    }

    #[test]
    fn test_forecast_net_debt_fallback_without_balance_sheet() {
        let out = compute_scenario(&base_scenario(), &base_params(), &defaults()).unwrap();
        // no prior debt/cash pair: net debt = revenues * 20%
        assert_eq!(out.result[&2024].inputs.net_debt, Some(dec!(210.0000)));
    }

    #[test]
    fn test_forecast_net_debt_from_prior_balance_sheet() {
        let mut scenario = base_scenario();
        {
            let year = scenario.get_mut(&2023).unwrap();
            year.inputs.debt = Some(dec!(500));
            year.inputs.cash = Some(dec!(100));
        }
        let out = compute_scenario(&scenario, &base_params(), &defaults()).unwrap();
        // 500 - 100 * 1.02
        assert_eq!(out.result[&2024].inputs.net_debt, Some(dec!(398.00)));
    }

    #[test]
    fn test_legacy_depreciation_when_ppe_rate_zero() {
        // A deliberate zero PPE rate switches to the revenue-based rate;
        // the PPE-based rate wins whenever it is strictly positive.
        let params = ModelAssumptions {
            depr_on_ppe_pct: Some(dec!(0)),
            depr_pct: Some(dec!(0.05)),
            ..base_params()
        };
        let out = compute_scenario(&base_scenario(), &params, &defaults()).unwrap();
        // 5% of 1050
        assert_eq!(out.result[&2024].inputs.depr, Some(dec!(52.5000)));
    }

    #[test]
    fn test_growth_multiplier_clamped() {
        let params = ModelAssumptions {
            revenue_growth_multiplier: Some(dec!(5.0)),
            ..base_params()
        };
        let out = compute_scenario(&base_scenario(), &params, &defaults()).unwrap();
        // clamped to the 2.0 ceiling
        assert_eq!(out.result[&2024].inputs.revenues, Some(dec!(2000.0)));
    }

    #[test]
    fn test_forecast_years_are_contiguous() {
        let params = ModelAssumptions {
            forecast_years: Some(3),
            ..base_params()
        };
        let out = compute_scenario(&base_scenario(), &params, &defaults()).unwrap();
        let years: Vec<i32> = out.result.keys().copied().collect();
        assert_eq!(years, vec![2023, 2024, 2025, 2026]);
    }

    #[test]
    fn test_empty_scenario_produces_no_forecast() {
        let out = compute_scenario(&Scenario::new(), &base_params(), &defaults()).unwrap();
        assert!(out.result.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_projection_is_deterministic() {
        let scenario = base_scenario();
        let params = base_params();
        let first = compute_scenario(&scenario, &params, &defaults()).unwrap();
        let second = compute_scenario(&scenario, &params, &defaults()).unwrap();
        assert_eq!(first.result, second.result);
    }
}
