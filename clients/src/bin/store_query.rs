//! `fml-store-query`: attaches a cohort query to a validation request.
//!
//! **Usage:**
//! ```text
//! fml-store-query --config <fml.toml> --request <iri> --query <cohort.sparql>
//! ```
//!
//! Any query already stored for the request is replaced.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fairmodels_engine::SparqlEndpoint;
use fairmodels_validation::{Config, ValidationEndpoint};
use tracing::info;

/// Store the cohort query of a validation request.
#[derive(Parser)]
#[command(name = "fml-store-query", version, about = "Store the cohort query of a validation request")]
struct Args {
    /// Worker configuration (TOML, or JSON by extension).
    #[arg(long, default_value = "fml.toml")]
    config: PathBuf,

    /// Validation request IRI.
    #[arg(long)]
    request: String,

    /// File holding the SPARQL query that selects the cohort.
    #[arg(long)]
    query: PathBuf,

    /// Verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    fairmodels_clients::init_logging(args.verbose);

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let query = fs::read_to_string(&args.query)
        .with_context(|| format!("reading {}", args.query.display()))?;

    let store = SparqlEndpoint::new(config.validation_endpoint.url.clone(), config.http_timeout())?;
    let endpoint = ValidationEndpoint::new(Box::new(store), config.library());
    endpoint.store_query(&args.request, &query)?;

    info!(request = %args.request, "cohort query stored");
    Ok(())
}
