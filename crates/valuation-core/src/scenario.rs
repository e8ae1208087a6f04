use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::types::{nz, Money};

/// A full scenario keyed by year. BTreeMap iteration order gives the
/// ascending-year visit order every pass in the pipeline relies on.
pub type Scenario = BTreeMap<i32, ScenarioYear>;

/// Raw statement maps for one fiscal year, exactly as supplied by the
/// statement source. Field names are arbitrary; the normalizer resolves
/// them through alias tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatementYear {
    #[serde(rename = "IS", alias = "income_statement", default)]
    pub income_statement: Map<String, Value>,
    #[serde(rename = "BS", alias = "balance_sheet", default)]
    pub balance_sheet: Map<String, Value>,
    #[serde(rename = "CF", alias = "cash_flow", default)]
    pub cash_flow: Map<String, Value>,
}

impl RawStatementYear {
    pub fn is_empty(&self) -> bool {
        self.income_statement.is_empty()
            && self.balance_sheet.is_empty()
            && self.cash_flow.is_empty()
    }
}

/// Net debt supplied as either a bare total or a `{ "total": ... }`
/// object by scenarios assembled outside the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DebtComponents {
    Total(Decimal),
    Breakdown { total: Option<Decimal> },
}

impl DebtComponents {
    pub fn total(&self) -> Option<Decimal> {
        match self {
            Self::Total(t) => Some(*t),
            Self::Breakdown { total } => *total,
        }
    }
}

/// Canonical per-year input record. Every field is optional: a missing
/// statement line stays `None` and is coerced to zero only at the point
/// of use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearInputs {
    // Income statement
    pub revenues: Option<Money>,
    pub cogs: Option<Money>,
    pub sgna: Option<Money>,
    pub financial_expense: Option<Money>,
    pub net_income: Option<Money>,
    pub ebit: Option<Money>,
    pub gross_profit: Option<Money>,
    // Balance sheet
    pub cash: Option<Money>,
    pub receivables: Option<Money>,
    pub inventory: Option<Money>,
    pub ppe: Option<Money>,
    pub equity_parent: Option<Money>,
    pub short_term_liabilities: Option<Money>,
    pub long_term_liabilities: Option<Money>,
    pub payables: Option<Money>,
    pub debt: Option<Money>,
    pub net_debt: Option<Money>,
    pub debt_components: Option<DebtComponents>,
    // Cash flow
    pub operating_cf: Option<Money>,
    pub capex: Option<Money>,
    pub depr: Option<Money>,
    pub investing_cf: Option<Money>,
    pub financing_cf: Option<Money>,
    pub net_change_in_cash: Option<Money>,
}

impl YearInputs {
    /// NWC = receivables + inventory − payables, missing lines as zero.
    pub fn net_working_capital(&self) -> Decimal {
        nz(self.receivables) + nz(self.inventory) - nz(self.payables)
    }

    /// Whether any working-capital line was actually reported.
    pub fn has_working_capital(&self) -> bool {
        self.receivables.is_some() || self.inventory.is_some() || self.payables.is_some()
    }
}

/// Figures derived by the projector. `None` until the relevant pass has
/// run for the year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearOutputs {
    #[serde(rename = "grossProfit")]
    pub gross_profit: Option<Money>,
    pub ebit: Option<Money>,
    pub financial_expense: Option<Money>,
    pub net_income: Option<Money>,
    pub operating_cf: Option<Money>,
    /// Change in net working capital vs. the preceding year.
    #[serde(rename = "dNWC")]
    pub nwc_change: Option<Money>,
    pub fcff: Option<Money>,
    /// Beginning-of-year cash, recorded for forecast years.
    pub cash: Option<Money>,
}

/// One year of a scenario: the retained raw maps, the canonical inputs,
/// and the projector's outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioYear {
    #[serde(default)]
    pub raw: RawStatementYear,
    #[serde(default)]
    pub inputs: YearInputs,
    #[serde(default)]
    pub outputs: YearOutputs,
}

impl ScenarioYear {
    /// A year is historical iff its raw income statement is non-empty;
    /// forecast years carry empty raw maps.
    pub fn is_historical(&self) -> bool {
        !self.raw.income_statement.is_empty()
    }
}

/// Ascending list of the scenario's historical years.
pub fn historical_years(scenario: &Scenario) -> Vec<i32> {
    scenario
        .iter()
        .filter(|(_, sy)| sy.is_historical())
        .map(|(&year, _)| year)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_net_working_capital_treats_missing_as_zero() {
        let inputs = YearInputs {
            receivables: Some(dec!(100)),
            payables: Some(dec!(40)),
            ..YearInputs::default()
        };
        assert_eq!(inputs.net_working_capital(), dec!(60));
        assert!(inputs.has_working_capital());
        assert!(!YearInputs::default().has_working_capital());
    }

    #[test]
    fn test_historical_detection_via_raw_income_statement() {
        let mut year = ScenarioYear::default();
        assert!(!year.is_historical());
        year.raw
            .income_statement
            .insert("revenues".into(), json!(1000));
        assert!(year.is_historical());
    }

    #[test]
    fn test_debt_components_total() {
        assert_eq!(DebtComponents::Total(dec!(250)).total(), Some(dec!(250)));
        assert_eq!(
            DebtComponents::Breakdown {
                total: Some(dec!(300))
            }
            .total(),
            Some(dec!(300))
        );
        assert_eq!(DebtComponents::Breakdown { total: None }.total(), None);
    }

    #[test]
    fn test_debt_components_deserializes_both_shapes() {
        let bare: DebtComponents = serde_json::from_value(json!(120.5)).unwrap();
        assert_eq!(bare.total(), Some(dec!(120.5)));

        let object: DebtComponents = serde_json::from_value(json!({ "total": 98 })).unwrap();
        assert_eq!(object.total(), Some(dec!(98)));
    }

    #[test]
    fn test_historical_years_filters_forecast_years() {
        let mut scenario = Scenario::new();
        let mut hist = ScenarioYear::default();
        hist.raw.income_statement.insert("sales".into(), json!(1));
        scenario.insert(2022, hist);
        scenario.insert(2023, ScenarioYear::default());
        assert_eq!(historical_years(&scenario), vec![2022]);
    }
}
