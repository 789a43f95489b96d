//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Reaching-task session: hold on home, draw to the target, release
#[derive(Parser, Debug)]
#[command(name = "reach")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Session config (JSON); defaults apply to missing fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the number of trials
    #[arg(short = 'n', long)]
    pub trials: Option<usize>,

    /// Seed for target placement
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in a window instead of fullscreen
    #[arg(short, long)]
    pub windowed: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let cli = Cli::parse_from(["reach", "-n", "8", "--seed", "7", "--windowed"]);
        assert_eq!(cli.trials, Some(8));
        assert_eq!(cli.seed, Some(7));
        assert!(cli.windowed);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn command_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
