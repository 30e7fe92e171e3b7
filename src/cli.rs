use std::path::PathBuf;

use clap::Parser;

/// Long-polling publish/subscribe relay.
#[derive(Parser, Debug, Clone)]
#[command(name = "comet", version, about)]
pub struct Args {
    /// Verbose logging (same as log_level = "debug")
    #[arg(short, long)]
    pub verbose: bool,

    /// Bind address [default: 0.0.0.0]
    #[arg(short, long)]
    pub address: Option<String>,

    /// Bind port [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to config.json (defaults to the one next to the executable)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
