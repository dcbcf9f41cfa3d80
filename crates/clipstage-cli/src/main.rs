//! Clipstage CLI - offline processing through the oversampled distortion stage.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clipstage")]
#[command(author, version, about = "Oversampled nonlinear distortion stage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a WAV file through the stage
    Process(commands::process::ProcessArgs),

    /// List the available drive curves
    Curves(commands::curves::CurvesArgs),

    /// Print or write a stage configuration file
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => commands::process::run(args),
        Commands::Curves(args) => commands::curves::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
