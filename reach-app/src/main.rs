mod app;
mod cli;

use anyhow::Context;
use app::App;
use cli::Cli;
use reach_experiment::ExperimentConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(n) = cli.trials {
        config.n_trials = n;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    // refuse before any window exists
    config.validate().context("invalid session config")?;

    info!(
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        trials = config.n_trials,
        "starting reach session"
    );

    App::new(config, !cli.windowed).run()
}
