//! `fml-validate`: processes every open validation request once.
//!
//! **Usage:**
//! ```text
//! fml-validate --config <fml.toml>
//! ```
//!
//! Exits non-zero if any request failed.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use fairmodels_validation::{Config, ValidationEngine};

/// Run the FAIRmodels validation loop.
#[derive(Parser)]
#[command(name = "fml-validate", version, about = "Process open FAIRmodels validation requests")]
struct Args {
    /// Worker configuration (TOML, or JSON by extension).
    #[arg(long, default_value = "fml.toml")]
    config: PathBuf,

    /// Verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    fairmodels_clients::init_logging(args.verbose);

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let engine = ValidationEngine::from_config(&config)?;
    let report = engine.run()?;

    println!("{report}");
    if !report.all_succeeded() {
        process::exit(1);
    }
    Ok(())
}
