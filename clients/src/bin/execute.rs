//! `fml-execute`: runs a FAIRmodels model description on local data.
//!
//! **Usage:**
//! ```text
//! fml-execute --model <uri> [--sparql-endpoint <url>] [--library <dir>]
//!             (--observation <file.json> | --table <records.json>)
//! ```
//!
//! An observation is a JSON object keyed by feature IRI; the probability is
//! printed. A table is a JSON array of records keyed by the model's local
//! feature names; the records are printed back with a `probability` field.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use fairmodels_engine::{
    Dispatcher, ModelDescription, Observation, QueryLibrary, SparqlEndpoint, Table,
};
use tracing::info;

/// Execute a FAIRmodels prediction model.
#[derive(Parser)]
#[command(name = "fml-execute", version, about = "Execute a FAIRmodels prediction model")]
#[command(group(ArgGroup::new("input").required(true).args(["observation", "table"])))]
struct Args {
    /// Model description IRI, URL or file path.
    #[arg(long)]
    model: String,

    /// Model-cache SPARQL endpoint holding the description as a named graph.
    #[arg(long)]
    sparql_endpoint: Option<String>,

    /// Directory containing `queries/` (default: current directory).
    #[arg(long)]
    library: Option<PathBuf>,

    /// JSON object with one observation keyed by feature IRI.
    #[arg(long)]
    observation: Option<PathBuf>,

    /// JSON array of records keyed by local feature name.
    #[arg(long)]
    table: Option<PathBuf>,

    /// Verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    fairmodels_clients::init_logging(args.verbose);

    let endpoint = args
        .sparql_endpoint
        .as_deref()
        .map(|url| SparqlEndpoint::new(url, SparqlEndpoint::DEFAULT_TIMEOUT))
        .transpose()?;
    let model = Arc::new(ModelDescription::load(
        &args.model,
        endpoint.as_ref(),
        QueryLibrary::new(args.library.clone()),
    )?);
    let Some(executor) = Dispatcher::default().select_executor(&model)? else {
        bail!("no executor supports model {}", args.model);
    };
    info!(model = %args.model, kind = %executor.kind(), "executor selected");

    if let Some(path) = &args.observation {
        let observation: Observation = read_json(path)?;
        match executor.execute(&observation)? {
            Some(probability) => println!("{probability}"),
            None => bail!("the model produced no prediction"),
        }
    } else if let Some(path) = &args.table {
        let records: Vec<Observation> = read_json(path)?;
        let scored = executor.execute_batch(&Table::from_records(&records))?;
        println!("{}", serde_json::to_string_pretty(&scored.to_records())?);
    }
    Ok(())
}
