use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ValuationError;
use crate::scenario::{RawStatementYear, Scenario, ScenarioYear, YearInputs, YearOutputs};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Alias tables
//
// Ordered per canonical key: the first alias present (and non-null) in the
// relevant statement category wins. Extend these tables rather than the
// lookup logic when a new provider spelling shows up.
// ---------------------------------------------------------------------------

const REVENUES: &[&str] = &["revenues", "revenue", "sales"];
const COGS: &[&str] = &["cogs", "cost_of_goods_sold", "cost_of_sales"];
const NET_INCOME: &[&str] = &["net_income", "netProfit", "net_profit", "profit_after_tax"];
const EBIT: &[&str] = &["ebit", "operating_income"];
const GROSS_PROFIT: &[&str] = &["gross_profit", "grossProfit"];

const CASH: &[&str] = &["cash", "cash_and_equivalents", "cash_and_cash_equivalents"];
const RECEIVABLES: &[&str] = &["receivables", "accounts_receivable", "trade_receivables"];
const INVENTORY: &[&str] = &["inventory", "inventories", "stock"];
const PPE: &[&str] = &["ppe", "property_plant_equipment", "fixed_assets"];
const EQUITY: &[&str] = &["equity_parent", "equity", "total_equity"];
const SHORT_TERM_LIABILITIES: &[&str] = &["short_term_liabilities", "current_liabilities"];
const LONG_TERM_LIABILITIES: &[&str] = &["long_term_liabilities", "non_current_liabilities"];
const PAYABLES: &[&str] = &[
    "short_term_trade_payables",
    "accounts_payable",
    "short_term_liabilities",
    "trade_payables",
];

const OPERATING_CF: &[&str] = &[
    "operating_cf",
    "net_cash_from_operating_activities",
    "cash_from_operations",
];
const CAPEX: &[&str] = &["capex", "capital_expenditures", "purchase_of_fixed_assets"];
const DEPR: &[&str] = &["depr", "depreciation", "amortization"];
const INVESTING_CF: &[&str] = &["investing_cf", "net_cash_from_investing_activities"];
const FINANCING_CF: &[&str] = &["financing_cf", "net_cash_from_financing_activities"];
const NET_CHANGE_IN_CASH: &[&str] = &["net_change_in_cash", "change_in_cash"];

/// Gross debt is the sum of these six balance-sheet components.
const DEBT_COMPONENTS: &[&str] = &[
    "loans_short",
    "loans_long",
    "lease_liabilities_short",
    "lease_liabilities_long",
    "debt_issuance_short",
    "debt_issuance_long",
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Map raw per-year statements (arbitrary field names, grouped into
/// income / balance / cash-flow categories) into a canonical scenario.
///
/// Year labels must be integer-valued strings; everything else is
/// infallible, with unresolved fields simply staying `None`.
pub fn build_scenario(
    statements: &BTreeMap<String, RawStatementYear>,
) -> ValuationResult<Scenario> {
    let mut scenario = Scenario::new();
    for (label, stmt) in statements {
        let year: i32 = label
            .trim()
            .parse()
            .map_err(|_| ValuationError::InvalidInput {
                field: "statements".into(),
                reason: format!("year label '{label}' is not an integer"),
            })?;
        scenario.insert(year, normalize_year(stmt));
    }
    Ok(scenario)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn normalize_year(stmt: &RawStatementYear) -> ScenarioYear {
    let is = &stmt.income_statement;
    let bs = &stmt.balance_sheet;
    let cf = &stmt.cash_flow;

    let debt: Decimal = DEBT_COMPONENTS.iter().map(|key| safe_num(bs, key)).sum();

    let inputs = YearInputs {
        revenues: pick_first(is, REVENUES),
        cogs: pick_first(is, COGS),
        // Composite: SG&A net of other operating income, plus other
        // operating and selling expenses.
        sgna: Some(
            safe_num(is, "sgna") - safe_num(is, "other_operating_income")
                + safe_num(is, "other_operating_expense")
                + safe_num(is, "selling_expenses"),
        ),
        financial_expense: Some(
            safe_num(is, "financial_expense") - safe_num(is, "financial_income"),
        ),
        net_income: pick_first(is, NET_INCOME),
        ebit: pick_first(is, EBIT),
        gross_profit: pick_first(is, GROSS_PROFIT),

        cash: pick_first(bs, CASH),
        receivables: pick_first(bs, RECEIVABLES),
        inventory: pick_first(bs, INVENTORY),
        ppe: pick_first(bs, PPE),
        equity_parent: pick_first(bs, EQUITY),
        short_term_liabilities: pick_first(bs, SHORT_TERM_LIABILITIES),
        long_term_liabilities: pick_first(bs, LONG_TERM_LIABILITIES),
        payables: pick_first(bs, PAYABLES),
        debt: Some(debt),
        net_debt: Some(debt - safe_num(bs, "cash")),
        debt_components: None,

        operating_cf: pick_first(cf, OPERATING_CF),
        capex: pick_first(cf, CAPEX),
        depr: pick_first(cf, DEPR),
        investing_cf: pick_first(cf, INVESTING_CF),
        financing_cf: pick_first(cf, FINANCING_CF),
        net_change_in_cash: pick_first(cf, NET_CHANGE_IN_CASH),
    };

    ScenarioYear {
        raw: stmt.clone(),
        inputs,
        outputs: YearOutputs::default(),
    }
}

/// First present, non-null alias wins; an unparsable value resolves to
/// `None` rather than falling through to later aliases.
fn pick_first(map: &Map<String, Value>, aliases: &[&str]) -> Option<Decimal> {
    for key in aliases {
        if let Some(v) = map.get(*key) {
            if !v.is_null() {
                return coerce_value(v);
            }
        }
    }
    None
}

/// Safe coercion with a zero fallback, used for composite terms.
fn safe_num(map: &Map<String, Value>, key: &str) -> Decimal {
    map.get(key)
        .and_then(coerce_value)
        .unwrap_or(Decimal::ZERO)
}

/// Numbers and numeric strings become decimals; anything else is `None`.
fn coerce_value(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            n.as_f64().and_then(Decimal::from_f64)
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
