//! DSA Mentor CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use dsa_mentor::cli::Cli;
use dsa_mentor::commands;

fn main() {
    let cli = Cli::parse();

    // Paths are resolved lazily from the environment, so the flag must land
    // there before anything reads it
    if let Some(dir) = &cli.state_dir {
        std::env::set_var(mentor_core::config::STATE_DIR_ENV, dir);
    }

    // Load .env.local (for MENTOR_API_KEY etc.)
    mentor_core::config::load_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = commands::execute(cli.command, cli.model) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
