use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Use "warn" by default so command output stays clean, "debug" with --verbose
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = cli.paths();

    match cli.command {
        Commands::Defaults => crate::cli::hooks::defaults(&paths),
        Commands::Active => crate::cli::hooks::active(&paths),
        Commands::Save(args) => crate::cli::hooks::save(&paths, args),
        Commands::Add(args) => crate::cli::hooks::add(&paths, args),
        Commands::Remove(args) => crate::cli::hooks::remove(&paths, args),
        Commands::Reset => crate::cli::hooks::reset(&paths),
        Commands::Paths => crate::cli::paths::run(&paths),
    }
}
