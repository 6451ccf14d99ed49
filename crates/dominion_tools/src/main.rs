//! Dominion engine - development tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dominion_tools::simulate::{render, run_scenario, Scenario};
use dominion_tools::validate::validate_data_directory;

#[derive(Parser)]
#[command(name = "dominion-tools")]
#[command(about = "Development tools for the dominion invasion engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Resolve one invasion from a scenario file
    Simulate {
        /// Scenario RON file
        scenario: PathBuf,
        /// Path to data directory
        #[arg(long, default_value = "assets/data")]
        data: PathBuf,
        /// Print JSON instead of RON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match validate_data_directory(&path) {
                Ok(data) => tracing::info!(
                    races = data.races.len(),
                    spells = data.spells.len(),
                    "Validation passed"
                ),
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Simulate { scenario, data, json } => {
            let output = validate_data_directory(&data)
                .and_then(|data| Ok((data, Scenario::load(&scenario)?)))
                .and_then(|(data, scenario)| run_scenario(&data, &scenario))
                .and_then(|report| render(&report, json));
            match output {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    tracing::error!("Simulation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
