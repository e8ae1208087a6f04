use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use valuation_core::projection::compute_scenario;
use valuation_core::statements::build_scenario;

use super::{load_params, load_statements, resolve_defaults, CliResult};

/// Arguments for scenario projection
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to JSON statements file (or pipe on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON file with partial model assumptions
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Revenue growth multiplier, e.g. 1.05 for +5% per year
    #[arg(long)]
    pub growth: Option<Decimal>,

    /// Number of forecast years to project
    #[arg(long)]
    pub forecast_years: Option<u32>,

    /// Corporate tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Derive assumption defaults from historical ratios instead of the
    /// static table
    #[arg(long)]
    pub historical_defaults: bool,
}

pub fn run_scenario(args: ScenarioArgs) -> CliResult<Value> {
    let statements = load_statements(&args.input)?;
    let scenario = build_scenario(&statements)?;

    let mut params = load_params(&args.assumptions)?;
    // flags win over the assumptions file
    params.revenue_growth_multiplier = args.growth.or(params.revenue_growth_multiplier);
    params.forecast_years = args.forecast_years.or(params.forecast_years);
    params.tax_rate = args.tax_rate.or(params.tax_rate);

    let defaults = resolve_defaults(&scenario, args.historical_defaults)?;
    let projected = compute_scenario(&scenario, &params, &defaults)?;

    Ok(serde_json::to_value(&projected)?)
}
