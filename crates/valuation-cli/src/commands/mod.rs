pub mod averages;
pub mod scenario;
pub mod value;

use std::collections::BTreeMap;

use valuation_core::assumptions::{ModelAssumptions, ResolvedAssumptions};
use valuation_core::averages::compute_historical_averages;
use valuation_core::scenario::{historical_years, RawStatementYear, Scenario};

use crate::input;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load the raw per-year statements map from --input or piped stdin.
pub(crate) fn load_statements(
    input: &Option<String>,
) -> CliResult<BTreeMap<String, RawStatementYear>> {
    if let Some(path) = input {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err("statements are required: provide --input or pipe JSON on stdin".into())
    }
}

/// Load a partial assumption set from a JSON file, or start empty.
pub(crate) fn load_params(path: &Option<String>) -> CliResult<ModelAssumptions> {
    match path {
        Some(p) => input::file::read_json(p),
        None => Ok(ModelAssumptions::default()),
    }
}

/// The defaults table for resolving partial assumptions: either the static
/// table, or one derived from the scenario's historical ratios.
pub(crate) fn resolve_defaults(
    scenario: &Scenario,
    from_historicals: bool,
) -> CliResult<ResolvedAssumptions> {
    let table = ResolvedAssumptions::default();
    if !from_historicals {
        return Ok(table);
    }
    let hist = historical_years(scenario);
    let averaged = compute_historical_averages(scenario, &hist, &table)?;
    Ok(averaged.result.resolve(&table))
}
