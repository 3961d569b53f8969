use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use landshift::{ConfigLoader, Model, ModelConfig, ScenarioKind};

#[derive(Debug, Parser)]
#[command(author, version, about = "Landholder land-market simulation runner")]
struct Cli {
    /// Path to the run configuration YAML file
    #[arg(long, default_value = "scenarios/basic.yaml")]
    config: PathBuf,

    /// Override tick count (uses the configured default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the scenario (Basic, Trend, B2 or A1)
    #[arg(long)]
    scenario: Option<ScenarioKind>,

    /// Print the final world snapshot as JSON after the metrics
    #[arg(long)]
    snapshot: bool,
}

fn init_tracing(config: &ModelConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ConfigLoader::new(".");
    let mut config = loader.load(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(scenario) = cli.scenario {
        config.scenario = scenario;
    }
    init_tracing(&config);

    let ticks = config.ticks(cli.ticks);
    let mut model = Model::from_config(&config)
        .with_context(|| format!("failed to build model from {}", cli.config.display()))?;

    if let Some(initial) = model.history().first() {
        println!("{}", serde_json::to_string(&initial.metrics)?);
    }
    for _ in 0..ticks {
        let frame = model.step()?;
        println!("{}", serde_json::to_string(&frame.metrics)?);
    }
    info!(
        scenario = %config.scenario,
        ticks,
        landholders = model.world().landholder_count(),
        "run completed"
    );

    if cli.snapshot {
        println!("{}", model.snapshot().to_json()?);
    }
    Ok(())
}
