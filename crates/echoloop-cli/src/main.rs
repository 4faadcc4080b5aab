//! echoloop CLI - live karaoke echo with a spectrum display.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "echoloop")]
#[command(author, version, about = "Karaoke echo: microphone through a feedback delay to the speakers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive karaoke session
    Run(commands::run::RunArgs),

    /// List audio devices and check for a wireless speaker
    Devices(commands::devices::DevicesArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the bar display on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Devices(args) => commands::devices::run(args),
    }
}
