use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Day-count working-capital formulas divide by this.
pub const DAYS_IN_YEAR: Decimal = dec!(365);

/// Day-count assumptions are capped at five years.
const MAX_WORKING_CAPITAL_DAYS: Decimal = dec!(1825);

const MIN_GROWTH_MULTIPLIER: Decimal = dec!(0.5);
const MAX_GROWTH_MULTIPLIER: Decimal = dec!(2.0);
const MAX_NET_DEBT_PCT: Decimal = dec!(5);

// ---------------------------------------------------------------------------
// Model assumptions
// ---------------------------------------------------------------------------

/// Partial assumption set, as edited by a caller. Any omitted field falls
/// back to the defaults table when resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelAssumptions {
    /// Revenue growth as a multiplier, e.g. 1.05 for +5% per year.
    pub revenue_growth_multiplier: Option<Decimal>,
    pub forecast_years: Option<u32>,

    // Income statement, as % of revenues
    pub cogs_pct: Option<Rate>,
    pub sgna_pct: Option<Rate>,
    pub capex_pct: Option<Rate>,

    /// Preferred: depreciation as % of previous-year PPE.
    pub depr_on_ppe_pct: Option<Rate>,
    /// Legacy fallback: depreciation as % of revenues, used when
    /// `depr_on_ppe_pct` is zero.
    pub depr_pct: Option<Rate>,

    /// Preferred: financial expense = previous net debt × interest rate.
    pub interest_rate: Option<Rate>,
    /// Legacy fallback: financial expense as % of revenues.
    pub fin_exp_pct: Option<Rate>,

    // Working capital, % of revenues (fallback when COGS is zero)
    pub receivables_pct: Option<Rate>,
    pub inventory_pct: Option<Rate>,
    pub payables_pct: Option<Rate>,

    // Working capital, day counts (preferred): DSO / DIO / DPO
    pub receivables_days: Option<Decimal>,
    pub inventory_days: Option<Decimal>,
    pub payables_days: Option<Decimal>,

    /// Fallback net debt = revenues × this, when the prior balance sheet
    /// is unknown.
    pub net_debt_pct: Option<Rate>,
    /// Growth applied to non-modeled balance-sheet items per year.
    pub balance_growth_pct: Option<Rate>,

    pub tax_rate: Option<Rate>,
}

impl ModelAssumptions {
    /// Fill gaps from the defaults table and clamp every field to its
    /// model bounds before use.
    pub fn resolve(&self, defaults: &ResolvedAssumptions) -> ResolvedAssumptions {
        ResolvedAssumptions {
            revenue_growth_multiplier: clamp_growth(
                self.revenue_growth_multiplier
                    .unwrap_or(defaults.revenue_growth_multiplier),
            ),
            forecast_years: self
                .forecast_years
                .unwrap_or(defaults.forecast_years)
                .clamp(1, 10),
            cogs_pct: clamp_pct(self.cogs_pct.unwrap_or(defaults.cogs_pct)),
            sgna_pct: clamp_pct(self.sgna_pct.unwrap_or(defaults.sgna_pct)),
            capex_pct: clamp_pct(self.capex_pct.unwrap_or(defaults.capex_pct)),
            depr_on_ppe_pct: clamp_pct(self.depr_on_ppe_pct.unwrap_or(defaults.depr_on_ppe_pct)),
            depr_pct: clamp_pct(self.depr_pct.unwrap_or(defaults.depr_pct)),
            interest_rate: clamp_pct(self.interest_rate.unwrap_or(defaults.interest_rate)),
            fin_exp_pct: clamp_pct(self.fin_exp_pct.unwrap_or(defaults.fin_exp_pct)),
            receivables_pct: clamp_pct(self.receivables_pct.unwrap_or(defaults.receivables_pct)),
            inventory_pct: clamp_pct(self.inventory_pct.unwrap_or(defaults.inventory_pct)),
            payables_pct: clamp_pct(self.payables_pct.unwrap_or(defaults.payables_pct)),
            receivables_days: clamp_days(
                self.receivables_days.unwrap_or(defaults.receivables_days),
            ),
            inventory_days: clamp_days(self.inventory_days.unwrap_or(defaults.inventory_days)),
            payables_days: clamp_days(self.payables_days.unwrap_or(defaults.payables_days)),
            net_debt_pct: self
                .net_debt_pct
                .unwrap_or(defaults.net_debt_pct)
                .clamp(Decimal::ZERO, MAX_NET_DEBT_PCT),
            balance_growth_pct: clamp_pct(
                self.balance_growth_pct.unwrap_or(defaults.balance_growth_pct),
            ),
            tax_rate: clamp_pct(self.tax_rate.unwrap_or(defaults.tax_rate)),
        }
    }
}

/// Fully-resolved assumption set: every field concrete and clamped.
/// The `Default` impl is the model's single defaults table, injected into
/// both the projector and the historical averager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAssumptions {
    pub revenue_growth_multiplier: Decimal,
    pub forecast_years: u32,
    pub cogs_pct: Rate,
    pub sgna_pct: Rate,
    pub capex_pct: Rate,
    pub depr_on_ppe_pct: Rate,
    pub depr_pct: Rate,
    pub interest_rate: Rate,
    pub fin_exp_pct: Rate,
    pub receivables_pct: Rate,
    pub inventory_pct: Rate,
    pub payables_pct: Rate,
    pub receivables_days: Decimal,
    pub inventory_days: Decimal,
    pub payables_days: Decimal,
    pub net_debt_pct: Rate,
    pub balance_growth_pct: Rate,
    pub tax_rate: Rate,
}

impl Default for ResolvedAssumptions {
    fn default() -> Self {
        Self {
            revenue_growth_multiplier: dec!(1.05),
            forecast_years: 3,
            cogs_pct: dec!(0.60),
            sgna_pct: dec!(0.15),
            capex_pct: dec!(0.05),
            depr_on_ppe_pct: dec!(0.08),
            depr_pct: dec!(0.05),
            interest_rate: dec!(0.05),
            fin_exp_pct: dec!(0.02),
            receivables_pct: dec!(0.10),
            inventory_pct: dec!(0.08),
            payables_pct: dec!(0.06),
            // pct × 365
            receivables_days: dec!(36.5),
            inventory_days: dec!(29.2),
            payables_days: dec!(21.9),
            net_debt_pct: dec!(0.20),
            balance_growth_pct: dec!(0.02),
            tax_rate: dec!(0.19),
        }
    }
}

impl ResolvedAssumptions {
    /// The same set as a fully-populated partial, e.g. for handing the
    /// static defaults back from the averager.
    pub fn as_assumptions(&self) -> ModelAssumptions {
        ModelAssumptions {
            revenue_growth_multiplier: Some(self.revenue_growth_multiplier),
            forecast_years: Some(self.forecast_years),
            cogs_pct: Some(self.cogs_pct),
            sgna_pct: Some(self.sgna_pct),
            capex_pct: Some(self.capex_pct),
            depr_on_ppe_pct: Some(self.depr_on_ppe_pct),
            depr_pct: Some(self.depr_pct),
            interest_rate: Some(self.interest_rate),
            fin_exp_pct: Some(self.fin_exp_pct),
            receivables_pct: Some(self.receivables_pct),
            inventory_pct: Some(self.inventory_pct),
            payables_pct: Some(self.payables_pct),
            receivables_days: Some(self.receivables_days),
            inventory_days: Some(self.inventory_days),
            payables_days: Some(self.payables_days),
            net_debt_pct: Some(self.net_debt_pct),
            balance_growth_pct: Some(self.balance_growth_pct),
            tax_rate: Some(self.tax_rate),
        }
    }
}

// ---------------------------------------------------------------------------
// DCF assumptions
// ---------------------------------------------------------------------------

/// Discounting parameters for the FCFF DCF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcfAssumptions {
    /// Discount rate (WACC), e.g. 0.09 for 9%.
    pub wacc: Rate,
    /// Perpetual growth rate for the terminal value.
    pub perpetual_growth: Rate,
    /// Optional tax-rate override; 0.19 when absent.
    #[serde(default)]
    pub tax_rate: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Clamp helpers
// ---------------------------------------------------------------------------

pub(crate) fn clamp_pct(v: Decimal) -> Decimal {
    v.clamp(Decimal::ZERO, Decimal::ONE)
}

pub(crate) fn clamp_days(v: Decimal) -> Decimal {
    v.clamp(Decimal::ZERO, MAX_WORKING_CAPITAL_DAYS)
}

pub(crate) fn clamp_growth(v: Decimal) -> Decimal {
    v.clamp(MIN_GROWTH_MULTIPLIER, MAX_GROWTH_MULTIPLIER)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
