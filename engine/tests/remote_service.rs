//! Containerized model execution against a mocked prediction service.

use std::sync::Arc;

use fairmodels_engine::{
    Dispatcher, EngineError, Executor, ExecutorKind, InvocationOutcome, Observation, PortBinding,
    RemoteServiceConfig, RemoteServiceExecutor, Table,
};
use fairmodels_test_helpers::{
    description, remote_model_ttl, RecordingRuntime, RuntimeCall, FEATURE_CN, FEATURE_CT,
    FEATURE_TLENGTH, NCIT_T3, REMOTE_IMAGE, REMOTE_MODEL,
};
use mockito::Matcher;
use serde_json::{json, Value};

fn remote_executor(
    method: &str,
    runtime: Arc<RecordingRuntime>,
    base_url: String,
) -> RemoteServiceExecutor {
    let config = RemoteServiceConfig {
        base_url,
        ..RemoteServiceConfig::default()
    };
    let model = description(REMOTE_MODEL, &remote_model_ttl(method));
    match Dispatcher::new(runtime, config).select_executor(&model).unwrap() {
        Some(Executor::RemoteService(executor)) => executor,
        other => panic!("expected a remote executor, got {other:?}"),
    }
}

fn local_observation() -> Observation {
    [
        ("cT".to_string(), json!(NCIT_T3)),
        ("cN".to_string(), json!(1)),
        ("tLength".to_string(), json!(15)),
    ]
    .into_iter()
    .collect()
}

#[test]
fn execution_type_wins_over_recognized_algorithm_type() {
    let runtime = RecordingRuntime::new();
    let model = description(REMOTE_MODEL, &remote_model_ttl("POST"));
    let executor = Dispatcher::new(runtime.clone(), RemoteServiceConfig::default())
        .select_executor(&model)
        .unwrap()
        .unwrap();
    assert_eq!(executor.kind(), ExecutorKind::RemoteService);
}

#[test]
fn construction_provisions_the_declared_image() {
    let runtime = RecordingRuntime::new();
    let executor = remote_executor("POST", runtime.clone(), "http://localhost:5000".into());

    assert!(executor.is_provisioned());
    assert_eq!(executor.descriptor().image, REMOTE_IMAGE);
    assert_eq!(executor.descriptor().bulk_invocation_path, "/bulk");
    assert_eq!(
        runtime.calls(),
        vec![
            RuntimeCall::Pull(REMOTE_IMAGE.to_string()),
            RuntimeCall::Start(
                REMOTE_IMAGE.to_string(),
                PortBinding {
                    container_port: "5000".into(),
                    bind_address: "127.0.0.1".into(),
                    host_port: 5000,
                }
            ),
        ]
    );
}

#[test]
fn container_is_torn_down_exactly_once() {
    let runtime = RecordingRuntime::new();
    let executor = remote_executor("POST", runtime.clone(), "http://localhost:5000".into());
    assert_eq!(runtime.stops(), 0);
    drop(executor);
    assert_eq!(runtime.stops(), 1);
    assert_eq!(runtime.removals(), 1);
}

#[test]
fn single_call_posts_translated_features() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            FEATURE_CT: 3,
            FEATURE_CN: 1,
            FEATURE_TLENGTH: 15,
            "cT": NCIT_T3,
        })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": true, "probability": 0.42}"#)
        .create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let probability = executor.execute(&local_observation()).unwrap();

    mock.assert();
    assert_eq!(probability, Some(0.42));
}

#[test]
fn feature_iri_takes_precedence_over_local_name() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ FEATURE_TLENGTH: 20 })))
        .with_body(r#"{"probability": 0.3}"#)
        .create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let mut observation = local_observation();
    observation.insert(FEATURE_TLENGTH.to_string(), json!(20));
    assert_eq!(
        executor.invoke(&observation).unwrap(),
        InvocationOutcome::Probability(0.3)
    );
    mock.assert();
}

#[test]
fn response_without_probability_is_reported() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/")
        .with_body(r#"{"success": false, "message": "Could not parse input as JSON"}"#)
        .create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    assert_eq!(
        executor.invoke(&local_observation()).unwrap(),
        InvocationOutcome::MissingProbability
    );
    assert_eq!(executor.execute(&local_observation()).unwrap(), None);
}

#[test]
fn server_error_is_a_transport_outcome() {
    let mut server = mockito::Server::new();
    let _mock = server.mock("POST", "/").with_status(500).create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let outcome = executor.invoke(&local_observation()).unwrap();
    assert!(matches!(outcome, InvocationOutcome::Transport(_)), "{outcome:?}");
}

#[test]
fn non_json_response_is_a_decode_outcome() {
    let mut server = mockito::Server::new();
    let _mock = server.mock("POST", "/").with_body("Hello, World").create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let outcome = executor.invoke(&local_observation()).unwrap();
    assert!(matches!(outcome, InvocationOutcome::Decode(_)), "{outcome:?}");
}

#[test]
fn only_post_is_supported() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/").expect(0).create();

    let executor = remote_executor("GET", RecordingRuntime::new(), server.url());
    assert_eq!(
        executor.invoke(&local_observation()).unwrap(),
        InvocationOutcome::UnsupportedMethod("GET".into())
    );
    assert_eq!(executor.execute(&local_observation()).unwrap(), None);
    mock.assert();
}

#[test]
fn failed_start_leaves_executor_unprovisioned() {
    let runtime = RecordingRuntime::failing_start();
    let executor = remote_executor("POST", runtime.clone(), "http://localhost:5000".into());

    assert!(!executor.is_provisioned());
    assert_eq!(
        executor.invoke(&local_observation()).unwrap(),
        InvocationOutcome::NotProvisioned
    );
    drop(executor);
    assert_eq!(runtime.stops(), 0);
}

fn local_table() -> Table {
    Table::from_rows(
        vec!["identifier".into(), "cT".into(), "cN".into(), "tLength".into()],
        vec![
            vec![json!(1), json!(NCIT_T3), json!(1), json!(15)],
            vec![json!(2), json!(2), json!(0), json!(4)],
        ],
    )
    .unwrap()
}

#[test]
fn batch_is_one_bulk_round_trip() {
    let response_table = json!({
        "identifier": { "0": 1, "1": 2 },
        FEATURE_CT: { "0": 3, "1": 2 },
        FEATURE_CN: { "0": 1, "1": 0 },
        FEATURE_TLENGTH: { "0": 15, "1": 4 },
        "probability": { "0": 0.1037, "1": 0.3 }
    });
    // Bulk services answer with the encoded table wrapped in a JSON string.
    let body = Value::String(response_table.to_string()).to_string();

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/bulk")
        .match_body(Matcher::Regex(r#"^"\{"#.into()))
        .with_body(body)
        .expect(1)
        .create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let result = executor.execute_batch(&local_table()).unwrap();

    mock.assert();
    assert_eq!(result.len(), 2);
    assert!(result.has_column("cT"));
    assert!(!result.has_column(FEATURE_CT));
    assert_eq!(result.get(1, "probability"), Some(&json!(0.3)));
}

#[test]
fn batch_accepts_plain_json_table_response() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/bulk")
        .with_body(
            json!({
                FEATURE_CT: { "0": 3 },
                FEATURE_CN: { "0": 1 },
                FEATURE_TLENGTH: { "0": 15 },
                "probability": { "0": 0.25 }
            })
            .to_string(),
        )
        .create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let result = executor.execute_batch(&local_table()).unwrap();
    assert_eq!(result.get(0, "probability"), Some(&json!(0.25)));
    assert_eq!(result.get(0, "tLength"), Some(&json!(15)));
}

#[test]
fn batch_checks_columns_before_calling() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/bulk").expect(0).create();

    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let table = Table::from_rows(vec!["cT".into()], vec![vec![json!(3)]]).unwrap();
    let err = executor.execute_batch(&table).unwrap_err();

    assert!(matches!(err, EngineError::ColumnNotFound(_)));
    mock.assert();
}

#[test]
fn batch_failures_propagate() {
    let executor = remote_executor(
        "POST",
        RecordingRuntime::failing_start(),
        "http://localhost:5000".into(),
    );
    let err = executor.execute_batch(&local_table()).unwrap_err();
    assert!(matches!(err, EngineError::Invocation(_)));

    let mut server = mockito::Server::new();
    let _mock = server.mock("POST", "/bulk").with_body("[1, 2]").create();
    let executor = remote_executor("POST", RecordingRuntime::new(), server.url());
    let err = executor.execute_batch(&local_table()).unwrap_err();
    assert!(matches!(err, EngineError::Invocation(_)));
}
