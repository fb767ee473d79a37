//! Corvid CLI - render, check and inspect control-voltage patches.

mod commands;
mod wav;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "corvid")]
#[command(author, version, about = "Corvid control-voltage engine CLI", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a patch to an 8-channel WAV file
    Render(commands::render::RenderArgs),

    /// Validate patch files without running them
    Check(commands::check::CheckArgs),

    /// Quantize voltages to a scale
    Quantize(commands::quantize::QuantizeArgs),

    /// Show a patch summary or WAV metadata
    Info(commands::info::InfoArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Quantize(args) => commands::quantize::run(args),
        Commands::Info(args) => commands::info::run(args),
    }
}
