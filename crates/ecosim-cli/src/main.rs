use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecosim_core::{SimConfig, World};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Headless predator-prey simulation runner.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON config; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the config seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Write JSON here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run for a number of ticks and print sampled population metrics.
    Run {
        #[arg(long, default_value_t = 1000)]
        steps: usize,
        #[arg(long, default_value_t = 10)]
        sample_every: usize,
    },

    /// Run for a number of ticks and dump the full world state.
    Snapshot {
        #[arg(long, default_value_t = 0)]
        steps: usize,
    },

    /// Print the effective config.
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_cli() {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = Cli::parse();
    let config = load_config(args.config.as_deref(), args.seed)?;

    match args.command {
        Command::Run {
            steps,
            sample_every,
        } => {
            let mut world = World::try_new(config).context("failed to build world")?;
            let summary = world
                .try_run_experiment(steps, sample_every)
                .context("experiment rejected")?;
            info!(
                steps,
                prey = summary.final_prey_count,
                predators = summary.final_predator_count,
                "run finished"
            );
            emit(&summary, args.output.as_deref())
        }
        Command::Snapshot { steps } => {
            let mut world = World::try_new(config).context("failed to build world")?;
            for _ in 0..steps {
                world.step();
            }
            emit(&world.snapshot(), args.output.as_deref())
        }
        Command::Config => emit(&config, args.output.as_deref()),
    }
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<SimConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            SimConfig::from_json_str(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config.validate().context("invalid config")?;
    Ok(config)
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
