//! Command-line host for orgsim.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Load configuration from `orgsim-config.yaml` (or `--config`)
//! 3. Initialize structured logging (tracing)
//! 4. Open the file result store under the configured results directory
//! 5. Dispatch the subcommand and print its JSON output to stdout
//!
//! Logs go to stderr so stdout stays machine-readable.

mod commands;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use orgsim_core::config::{CONFIG_FILE, LogFormat, LoggingConfig};
use orgsim_core::{FileResultStore, OrgsimConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::commands::ModelInputs;

#[derive(Parser)]
#[command(name = "orgsim")]
#[command(author, version, about = "Agent-based organizational behavior simulations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Results directory (overrides config)
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ModelArgs {
    /// Behavior kind (social_influence, diffusion_of_innovations, ...)
    #[arg(short, long)]
    kind: String,

    /// Topology JSON file with `nodes` and `edges`
    #[arg(short, long)]
    topology: PathBuf,

    /// Parameter JSON file
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Parameter override, `name=value` (repeatable)
    #[arg(short = 'P', long = "set")]
    overrides: Vec<String>,

    /// Steps per run (default: config `simulation.default_steps`)
    #[arg(short, long)]
    steps: Option<u64>,
}

impl ModelArgs {
    fn into_parts(self, default_steps: u64) -> (ModelInputs, u64) {
        let steps = self.steps.unwrap_or(default_steps);
        let inputs = ModelInputs {
            kind: self.kind,
            topology: self.topology,
            params_file: self.params,
            overrides: self.overrides,
        };
        (inputs, steps)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation
    Run {
        #[command(flatten)]
        model: ModelArgs,

        /// Simulation id (default: random)
        #[arg(long)]
        id: Option<String>,
    },

    /// Sweep one or two parameters over a grid
    Sweep {
        #[command(flatten)]
        model: ModelArgs,

        /// Swept range, `name=v1,v2,...` (once or twice)
        #[arg(short, long = "range", required = true)]
        ranges: Vec<String>,

        /// Final-state metric to collect per point
        #[arg(short, long)]
        metric: String,

        /// Concurrent points (default: config `sweep.max_workers`)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Sweep id (default: random)
        #[arg(long)]
        id: Option<String>,
    },

    /// Print a stored simulation result
    Show {
        /// Simulation id
        id: String,
    },

    /// Print a stored sweep result
    ShowSweep {
        /// Sweep id
        id: String,
    },

    /// List the behavior catalogue
    Theories {
        /// Only this behavior kind
        kind: Option<String>,
    },
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if configuration, input files, or the command fail.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = OrgsimConfig::load_or_default(&cli.config)?;
    if let Some(dir) = cli.results_dir {
        config.simulation.results_dir = dir;
    }
    init_logging(&config.logging);

    info!(
        config = %cli.config.display(),
        results_dir = %config.simulation.results_dir.display(),
        "orgsim starting"
    );

    let store = Arc::new(FileResultStore::new(&config.simulation.results_dir));
    let output = match cli.command {
        Commands::Run { model, id } => {
            let (inputs, steps) = model.into_parts(config.simulation.default_steps);
            commands::run(store, &inputs, steps, id).await?
        }
        Commands::Sweep {
            model,
            ranges,
            metric,
            workers,
            id,
        } => {
            let (inputs, steps) = model.into_parts(config.simulation.default_steps);
            let workers = workers.unwrap_or(config.sweep.max_workers);
            commands::sweep(store, &inputs, &ranges, metric, steps, workers, id).await?
        }
        Commands::Show { id } => commands::show(&store, &id)?,
        Commands::ShowSweep { id } => commands::show_sweep(&store, &id)?,
        Commands::Theories { kind } => commands::list_theories(kind.as_deref())?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    match logging.format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sweep_accepts_two_ranges() {
        let cli = Cli::try_parse_from([
            "orgsim",
            "sweep",
            "--kind",
            "social_influence",
            "--topology",
            "t.json",
            "-r",
            "influence_strength=0.05,0.1",
            "-r",
            "conformity_bias=0.1,0.3",
            "--metric",
            "culture_homogeneity",
        ])
        .unwrap();
        match cli.command {
            Commands::Sweep { ranges, model, .. } => {
                assert_eq!(ranges.len(), 2);
                assert_eq!(model.steps, None);
            }
            _ => unreachable!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn run_collects_overrides_and_defaults_steps() {
        let cli = Cli::try_parse_from([
            "orgsim",
            "run",
            "-k",
            "diffusion_of_innovations",
            "-t",
            "t.json",
            "-P",
            "random_seed=1",
            "--set",
            "initial_adopters=0.1",
        ])
        .unwrap();
        let Commands::Run { model, id } = cli.command else {
            unreachable!("parsed the wrong subcommand");
        };
        assert!(id.is_none());
        let (inputs, steps) = model.into_parts(100);
        assert_eq!(steps, 100);
        assert_eq!(inputs.overrides.len(), 2);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
    }
}
