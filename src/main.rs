// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "codescan")]
#[command(about = "Adaptive QR and barcode scanning")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded detection trace through a scan session
    Simulate {
        /// Trace file: JSON array of `{ "at_ms": .., "detections": [..] }`
        trace: PathBuf,

        /// Max zoom reported by the simulated camera
        #[arg(short, long, default_value = "4.0")]
        max_zoom: f64,

        /// Keep sampling zoom for this long after the last frame
        #[arg(short, long, default_value = "0")]
        settle_ms: u64,
    },

    /// Decode a code from an image file, as a gallery pick would
    Decode {
        /// Image file to decode
        image: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=codescan=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            trace,
            max_zoom,
            settle_ms,
        } => cli::simulate(config, &trace, max_zoom, settle_ms),
        Commands::Decode { image } => cli::decode(config, image),
        Commands::Config => cli::print_config(&config),
    }
}
