//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "kvitto", about = "Receipt analysis and export backend", version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Listen port (falls back to the PORT env var, then 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Analyze a local receipt image and print the extracted JSON
    Analyze {
        /// Path to the image file
        file: PathBuf,
    },
}
