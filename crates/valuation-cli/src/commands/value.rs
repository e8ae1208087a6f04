use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use valuation_core::assumptions::DcfAssumptions;
use valuation_core::dcf::calculate_dcf_fcff;
use valuation_core::projection::compute_scenario;
use valuation_core::statements::build_scenario;

use super::{load_params, load_statements, resolve_defaults, CliResult};

/// Arguments for the full normalize / project / value pipeline
#[derive(Args)]
pub struct ValueArgs {
    /// Path to JSON statements file (or pipe on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON file with partial model assumptions
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Discount rate (WACC), e.g. 0.09 for 9%
    #[arg(long)]
    pub wacc: Decimal,

    /// Perpetual growth rate for the terminal value
    #[arg(long, default_value = "0.02")]
    pub perpetual_growth: Decimal,

    /// Corporate tax rate, applied to both projection and valuation
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Derive assumption defaults from historical ratios instead of the
    /// static table
    #[arg(long)]
    pub historical_defaults: bool,

    /// Shares outstanding, in thousands; adds equityPerShare to the result
    #[arg(long)]
    pub shares_outstanding: Option<Decimal>,
}

pub fn run_value(args: ValueArgs) -> CliResult<Value> {
    let statements = load_statements(&args.input)?;
    let scenario = build_scenario(&statements)?;

    let mut params = load_params(&args.assumptions)?;
    params.tax_rate = args.tax_rate.or(params.tax_rate);

    let defaults = resolve_defaults(&scenario, args.historical_defaults)?;
    let projected = compute_scenario(&scenario, &params, &defaults)?;

    let dcf_params = DcfAssumptions {
        wacc: args.wacc,
        perpetual_growth: args.perpetual_growth,
        tax_rate: args.tax_rate,
    };
    let valued = calculate_dcf_fcff(&projected.result, &dcf_params)?;

    let mut out = serde_json::to_value(&valued)?;

    // Statement figures are in thousands; shares are a unit count.
    if let Some(shares) = args.shares_outstanding {
        if shares > Decimal::ZERO {
            let per_share = valued.result.equity_value * dec!(1000) / shares;
            if let Some(result) = out.get_mut("result").and_then(Value::as_object_mut) {
                result.insert("equityPerShare".to_string(), serde_json::to_value(per_share)?);
            }
        }
    }

    Ok(out)
}
