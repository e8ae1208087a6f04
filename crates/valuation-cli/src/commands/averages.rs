use clap::Args;
use serde_json::Value;

use valuation_core::assumptions::ResolvedAssumptions;
use valuation_core::averages::compute_historical_averages;
use valuation_core::scenario::historical_years;
use valuation_core::statements::build_scenario;

use super::{load_statements, CliResult};

/// Arguments for historical ratio averaging
#[derive(Args)]
pub struct AveragesArgs {
    /// Path to JSON statements file (or pipe on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Restrict averaging to the last N historical years
    #[arg(long)]
    pub years: Option<usize>,
}

pub fn run_averages(args: AveragesArgs) -> CliResult<Value> {
    let statements = load_statements(&args.input)?;
    let scenario = build_scenario(&statements)?;
    let mut hist = historical_years(&scenario);
    if let Some(n) = args.years {
        if hist.len() > n {
            hist = hist.split_off(hist.len() - n);
        }
    }

    let defaults = ResolvedAssumptions::default();
    let averaged = compute_historical_averages(&scenario, &hist, &defaults)?;

    Ok(serde_json::to_value(&averaged)?)
}
