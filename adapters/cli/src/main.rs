#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a strategy against the game engine over
//! stdin and stdout.

mod session;

use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use breach_system_turn::{StrategyProfile, TurnOrchestrator, BUILTIN_PROFILES};
use clap::{builder::PossibleValuesParser, Parser};

use crate::session::Session;

/// Command-line arguments for the strategy binary.
#[derive(Debug, Parser)]
#[command(name = "breach-algo", about = "Plays a tower defense strategy over the engine protocol")]
struct CliArgs {
    /// Built-in strategy to play.
    #[arg(long, default_value = "starter", value_parser = PossibleValuesParser::new(BUILTIN_PROFILES))]
    strategy: String,
    /// TOML strategy profile, used instead of the built-in strategy.
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,
    /// Seed for randomized decisions.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Log filter applied when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Print the selected profile as TOML and exit.
    #[arg(long)]
    print_profile: bool,
}

/// Entry point for the strategy binary.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.as_str()))
        .target(env_logger::Target::Stderr)
        .init();

    let profile = load_profile(&args)?;
    if args.print_profile {
        print!("{}", profile.to_toml_string().context("failed to encode strategy profile")?);
        return Ok(());
    }

    log::info!("playing strategy {} with seed {}", profile.name, args.seed);
    let mut session = Session::new(TurnOrchestrator::new(profile, args.seed));
    session.run(io::stdin().lock(), io::stdout().lock())
}

fn load_profile(args: &CliArgs) -> Result<StrategyProfile> {
    match &args.profile {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read strategy profile {}", path.display()))?;
            StrategyProfile::from_toml_str(&contents)
                .with_context(|| format!("failed to load strategy profile {}", path.display()))
        }
        None => StrategyProfile::builtin(&args.strategy)
            .with_context(|| format!("unknown strategy {}", args.strategy)),
    }
}
