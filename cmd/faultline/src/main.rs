//! Faultline CLI - minimal cut sets and counterexample replay.
//!
//! Commands:
//! - `faultline analyze` - Find minimal critical fault sets of a fixture model
//! - `faultline replay` - Step through a saved counterexample
//! - `faultline simulate` - Run a seeded random simulation
//! - `faultline reach` - Bounded hazard probability of a fixture model

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::FixtureModel;

#[derive(Parser)]
#[command(name = "faultline")]
#[command(about = "Minimal cut set analysis and counterexample replay for fault models")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the minimal fault sets that make the model's hazard reachable
    Analyze {
        /// Fixture model to analyse
        #[arg(value_enum)]
        model: FixtureModel,

        /// Analysis configuration file (yaml or json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Worker threads, overrides the configuration file
        #[arg(long, env = "FAULTLINE_CPU_COUNT")]
        cpu_count: Option<usize>,

        /// State capacity per check, overrides the configuration file
        #[arg(long)]
        state_capacity: Option<usize>,

        /// Directory to save one counterexample per cut set into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replay a saved counterexample
    Replay {
        /// Fixture model the trace was recorded for
        #[arg(value_enum)]
        model: FixtureModel,

        /// Path to the .fcx file
        trace: PathBuf,

        /// Only show the state after this many transitions
        #[arg(short, long)]
        step: Option<usize>,
    },

    /// Run a seeded random simulation and optionally save its trace
    Simulate {
        /// Fixture model to simulate
        #[arg(value_enum)]
        model: FixtureModel,

        /// RNG seed
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Number of transitions
        #[arg(short = 'n', long, default_value_t = 20)]
        steps: usize,

        /// Save the trace to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the probability of reaching the hazard within a step bound
    Reach {
        /// Fixture model to analyse
        #[arg(value_enum)]
        model: FixtureModel,

        /// Step bound
        #[arg(short = 'n', long, default_value_t = 10)]
        steps: usize,

        /// Let faults activate nondeterministically
        #[arg(long)]
        faults: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Analyze {
            model,
            config,
            cpu_count,
            state_capacity,
            output,
        } => commands::analyze::run(
            model,
            config.as_deref(),
            cpu_count,
            state_capacity,
            output.as_deref(),
        ),
        Commands::Replay { model, trace, step } => commands::replay::run(model, &trace, step),
        Commands::Simulate {
            model,
            seed,
            steps,
            output,
        } => commands::simulate::run(model, seed, steps, output.as_deref()),
        Commands::Reach {
            model,
            steps,
            faults,
        } => commands::reach::run(model, steps, faults),
    }
}
