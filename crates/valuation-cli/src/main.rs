mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::averages::AveragesArgs;
use commands::scenario::ScenarioArgs;
use commands::value::ValueArgs;

/// Statement-driven forecasting and DCF valuation
#[derive(Parser)]
#[command(
    name = "dcfv",
    version,
    about = "Statement-driven forecasting and FCFF DCF valuation",
    long_about = "Normalizes raw financial statements, projects forecast years from \
                  driver assumptions, derives assumption defaults from historical \
                  ratios, and values the result with an FCFF discounted cash flow. \
                  All arithmetic is decimal, never floating point."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize statements and project forecast years
    Scenario(ScenarioArgs),
    /// Derive assumption defaults from historical ratios
    Averages(AveragesArgs),
    /// Run the full pipeline: normalize, project, and value
    Value(ValueArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Scenario(args) => commands::scenario::run_scenario(args),
        Commands::Averages(args) => commands::averages::run_averages(args),
        Commands::Value(args) => commands::value::run_value(args),
        Commands::Version => {
            println!("dcfv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
