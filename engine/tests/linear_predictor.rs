//! End-to-end execution of logistic-regression model descriptions.

use std::sync::Arc;

use fairmodels_engine::{
    Dispatcher, EngineError, Executor, ExecutorKind, Observation, RemoteServiceConfig, Table,
};
use fairmodels_test_helpers::{
    description, RecordingRuntime, FEATURE_CN, FEATURE_CT, FEATURE_TLENGTH, INTERCEPT_ONLY_MODEL,
    INTERCEPT_ONLY_TTL, NCIT_N1, NCIT_T3, STIPHOUT_MODEL, STIPHOUT_TTL, UNSUPPORTED_MODEL,
    UNSUPPORTED_TTL,
};
use serde_json::{json, Value};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(RecordingRuntime::new(), RemoteServiceConfig::default())
}

fn stiphout() -> Executor {
    dispatcher()
        .select_executor(&description(STIPHOUT_MODEL, STIPHOUT_TTL))
        .unwrap()
        .expect("stiphout model should be executable")
}

fn observation(pairs: &[(&str, Value)]) -> Observation {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn cohort(ct: Vec<Value>) -> Table {
    let rows = ct
        .into_iter()
        .enumerate()
        .map(|(i, ct)| {
            let cn = [1, 0, 2, 1][i % 4];
            let length = [15, 4, 7, 10][i % 4];
            vec![json!(i + 1), ct, json!(cn), json!(length)]
        })
        .collect();
    Table::from_rows(
        vec!["identifier".into(), "cT".into(), "cN".into(), "tLength".into()],
        rows,
    )
    .unwrap()
}

#[test]
fn stiphout_model_dispatches_to_linear_predictor() {
    let executor = stiphout();
    assert_eq!(executor.kind(), ExecutorKind::LinearPredictor);

    let parameters = executor.parameters().unwrap();
    assert_eq!(parameters.len(), 3);
    assert_eq!(parameters[FEATURE_CT].local_name, "cT");
    assert_eq!(parameters[FEATURE_TLENGTH].beta, Some(-0.085));
}

#[test]
fn stiphout_scenario_yields_expected_probability() {
    let probability = stiphout()
        .execute(&observation(&[
            (FEATURE_CT, json!(3)),
            (FEATURE_CN, json!(1)),
            (FEATURE_TLENGTH, json!(15)),
        ]))
        .unwrap()
        .unwrap();
    assert!((probability - sigmoid(-2.157)).abs() < 1e-12);
    assert!((probability - 0.103_679).abs() < 1e-6);
}

#[test]
fn ontology_terms_are_translated_before_weighting() {
    let executor = stiphout();
    let coded = executor
        .execute(&observation(&[
            (FEATURE_CT, json!(3)),
            (FEATURE_CN, json!(1)),
            (FEATURE_TLENGTH, json!(15)),
        ]))
        .unwrap();
    let terms = executor
        .execute(&observation(&[
            (FEATURE_CT, json!(NCIT_T3)),
            (FEATURE_CN, json!(NCIT_N1)),
            (FEATURE_TLENGTH, json!(15)),
        ]))
        .unwrap();
    assert_eq!(coded, terms);
}

#[test]
fn term_tables_follow_coercion_rules() {
    let executor = stiphout();
    let resolver = executor.resolver();

    let ct = resolver.term_translation(FEATURE_CT).unwrap().unwrap();
    assert_eq!(ct.len(), 3);
    assert_eq!(ct[NCIT_T3], json!(3));
    assert!(resolver.term_translation(FEATURE_TLENGTH).unwrap().is_none());

    assert_eq!(
        resolver.resolve_local_value(FEATURE_CT, &json!(NCIT_T3)).unwrap(),
        json!(3)
    );
    assert_eq!(
        resolver.resolve_local_value(FEATURE_CT, &json!("T3")).unwrap(),
        json!("T3")
    );
}

#[test]
fn resolve_local_value_is_idempotent() {
    let executor = stiphout();
    let resolver = executor.resolver();
    for raw in [json!(NCIT_T3), json!(NCIT_N1), json!(15), json!("unmapped")] {
        for feature in [FEATURE_CT, FEATURE_CN, FEATURE_TLENGTH] {
            let once = resolver.resolve_local_value(feature, &raw).unwrap();
            let twice = resolver.resolve_local_value(feature, &once).unwrap();
            assert_eq!(once, twice, "{feature} {raw}");
        }
    }
}

#[test]
fn empty_parameter_set_yields_sigmoid_of_intercept() {
    let executor = dispatcher()
        .select_executor(&description(INTERCEPT_ONLY_MODEL, INTERCEPT_ONLY_TTL))
        .unwrap()
        .unwrap();
    assert!(executor.parameters().unwrap().is_empty());

    let probability = executor.execute(&Observation::new()).unwrap().unwrap();
    assert!((probability - sigmoid(-0.60)).abs() < 1e-12);
}

#[test]
fn missing_feature_is_named() {
    let err = stiphout()
        .execute(&observation(&[
            (FEATURE_CT, json!(3)),
            (FEATURE_TLENGTH, json!(15)),
        ]))
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingFeature(ref f) if f == FEATURE_CN));
}

#[test]
fn batch_agrees_with_single_execution() {
    let executor = stiphout();
    let table = cohort(vec![json!(3), json!(2), json!(NCIT_T3), json!(4)]);
    let result = executor.execute_batch(&table).unwrap();

    assert_eq!(
        result.columns(),
        ["identifier", "cT", "cN", "tLength", "probability"]
    );
    for row in 0..table.len() {
        let record = table.row_observation(row);
        let single = executor
            .execute(&observation(&[
                (FEATURE_CT, record["cT"].clone()),
                (FEATURE_CN, record["cN"].clone()),
                (FEATURE_TLENGTH, record["tLength"].clone()),
            ]))
            .unwrap()
            .unwrap();
        let batch = result.get(row, "probability").and_then(Value::as_f64).unwrap();
        assert!((single - batch).abs() < 1e-9, "row {row}: {single} vs {batch}");
    }
}

#[test]
fn batch_fails_fast_on_missing_column() {
    let table = Table::from_rows(
        vec!["cT".into(), "cN".into()],
        vec![vec![json!(3), json!(1)]],
    )
    .unwrap();
    let err = stiphout().execute_batch(&table).unwrap_err();
    assert!(matches!(err, EngineError::ColumnNotFound(ref c) if c == "tLength"));
}

#[test]
fn out_of_domain_value_only_fails_its_row() {
    let table = cohort(vec![
        json!(3),
        json!("http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#C00000"),
        json!(2),
    ]);
    let result = stiphout().execute_batch(&table).unwrap();

    assert_eq!(result.get(1, "probability"), Some(&Value::Null));
    assert!(result.get(0, "probability").and_then(Value::as_f64).is_some());
    assert!(result.get(2, "probability").and_then(Value::as_f64).is_some());
}

#[test]
fn existing_probability_column_is_overwritten() {
    let mut table = cohort(vec![json!(3)]);
    table.set_column("probability", vec![json!("stale")]).unwrap();
    let result = stiphout().execute_batch(&table).unwrap();
    assert_eq!(result.columns().len(), 5);
    assert!(result.get(0, "probability").and_then(Value::as_f64).is_some());
}

#[test]
fn unsupported_algorithm_has_no_executor() {
    let executor = dispatcher()
        .select_executor(&description(UNSUPPORTED_MODEL, UNSUPPORTED_TTL))
        .unwrap();
    assert!(executor.is_none());
}

#[test]
fn output_parameter_is_declared_outcome() {
    let model = description(STIPHOUT_MODEL, STIPHOUT_TTL);
    assert_eq!(model.output_parameter_name().unwrap().as_deref(), Some("dyspnea"));

    let bare = description(INTERCEPT_ONLY_MODEL, INTERCEPT_ONLY_TTL);
    assert_eq!(bare.output_parameter_name().unwrap(), None);
}

#[test]
fn executors_share_one_description() {
    let model = description(STIPHOUT_MODEL, STIPHOUT_TTL);
    let first = dispatcher().select_executor(&model).unwrap().unwrap();
    let second = dispatcher().select_executor(&model).unwrap().unwrap();
    assert!(Arc::ptr_eq(first.resolver().description(), second.resolver().description()));
}
