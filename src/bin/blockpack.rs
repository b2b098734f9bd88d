//! blockpack CLI
//!
//! Reads one disk map and prints its checksum under both compaction policies

use anyhow::{Context, Result};
use blockpack::{solve, CompactorConfig};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "blockpack")]
#[command(about = "Compact an extent-encoded disk map and print its checksums")]
struct Args {
    /// Disk map file (reads stdin when omitted or "-")
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the checksums as JSON
    #[arg(long)]
    json: bool,

    /// Render the disk layout at every compaction step (needs RUST_LOG=trace)
    #[arg(long)]
    trace: bool,
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("reading disk map from {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading disk map from stdin")?;
            Ok(buf)
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CompactorConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CompactorConfig::default(),
    };
    if args.trace {
        config.trace_layout = true;
    }
    info!("Config: {:?}", config);

    let input = read_input(args.input.as_ref())?;
    let sums = solve(&input, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sums)?);
    } else {
        println!("{sums}");
    }
    Ok(())
}
