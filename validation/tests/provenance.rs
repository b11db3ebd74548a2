//! Provenance output is well-formed N-Triples.

use fairmodels_engine::{LocalStore, SparqlService, Table};
use fairmodels_test_helpers::{COHORT_QUERY, COHORT_TTL, STIPHOUT_MODEL};
use fairmodels_validation::{BaselineStats, PerformanceMetrics, ProvenanceContext};
use sophia_api::graph::Graph;
use sophia_api::source::TripleSource;
use sophia_inmem::graph::LightGraph;
use sophia_turtle::parser::nt;

fn full_context() -> ProvenanceContext {
    let cohort_store = LocalStore::from_turtle(COHORT_TTL).unwrap();
    let cohort = Table::from_solutions(&cohort_store.select(COHORT_QUERY).unwrap());
    let metrics = PerformanceMetrics::compute(
        &[1.0, 0.0, 0.0, 1.0, 0.0, 1.0],
        &[0.9, 0.1, 0.4, 0.35, 0.2, 0.8],
    )
    .unwrap();

    let mut context = ProvenanceContext::new(
        "https://fairmodels.org/validation/request/1",
        STIPHOUT_MODEL,
        "worker \"01\"",
    );
    context.add_baseline(&BaselineStats::describe(&cohort));
    context.add_metrics(&metrics).unwrap();
    context
}

#[test]
fn ntriples_parse_back_into_the_same_statements() {
    let context = full_context();
    let text = context.to_ntriples();

    let graph: LightGraph = nt::parse_str(&text).collect_triples().unwrap();
    assert_eq!(graph.triples().count(), context.statements().len());
}

#[test]
fn result_iri_is_a_valid_subject() {
    let context = full_context();
    assert!(context.result_id().starts_with("https://fairmodels.org/validation/worker--01-/"));
    let first = context.to_ntriples().lines().next().unwrap().to_string();
    assert!(first.ends_with(&format!("<{}> .", context.result_id())));
}
