use filterweb::core::filter::FilterConfig;
use filterweb::core::types::ErrorCategory;
use filterweb::core::{builtin_registry, Payload, Pipeline};
use serde_json::{json, Value};

fn json_constant(value: Value) -> FilterConfig {
    FilterConfig::new(
        "constant",
        json!({"contentType": "application/json", "data": value.to_string()}),
    )
}

async fn run_jq(input: Value, expression: &str) -> Result<Value, ErrorCategory> {
    Pipeline::new(builtin_registry())
        .run(&[
            json_constant(input),
            FilterConfig::new("jq", json!({"expression": expression})),
        ])
        .await
        .map(|data| {
            assert_eq!(data.content_type, "application/json");
            match data.payload {
                Payload::Structured(value) => value,
                other => panic!("expected structured payload, got {:?}", other),
            }
        })
        .map_err(|failure| failure.error.category)
}

#[tokio::test]
async fn identity_wraps_value() {
    let input = json!({"users": [{"name": "a"}]});
    assert_eq!(run_jq(input.clone(), ".").await.unwrap(), json!([input]));
}

#[tokio::test]
async fn std_functions_are_available() {
    let out = run_jq(json!([3, 1, 2]), "sort | map(. + 1)").await.unwrap();
    assert_eq!(out, json!([[2, 3, 4]]));
    let out = run_jq(json!({"b": 1, "a": 2}), "keys").await.unwrap();
    assert_eq!(out, json!([["a", "b"]]));
}

#[tokio::test]
async fn empty_expression_is_missing_params() {
    assert_eq!(
        run_jq(json!(null), "  ").await.unwrap_err(),
        ErrorCategory::MissingParams
    );
}

#[tokio::test]
async fn halt_keeps_outputs_collected_so_far() {
    let out = run_jq(json!([1, 2, 3]), "1, halt, 2").await.unwrap();
    assert_eq!(out, json!([1]));
    let out = run_jq(json!([1, 2, 3]), ".[] | if . == 3 then halt else . end")
        .await
        .unwrap();
    assert_eq!(out, json!([1, 2]));
}

#[tokio::test]
async fn halt_before_any_output_yields_empty_list() {
    assert_eq!(run_jq(json!([1, 2, 3]), "halt").await.unwrap(), json!([]));
}

#[tokio::test]
async fn runtime_error_is_query_failure() {
    assert_eq!(
        run_jq(json!("text"), ".[0]").await.unwrap_err(),
        ErrorCategory::QueryFailure
    );
}

#[tokio::test]
async fn text_input_is_seen_as_string() {
    let data = Pipeline::new(builtin_registry())
        .run(&[
            FilterConfig::new("constant", json!({"data": "plain words"})),
            FilterConfig::new("jq", json!({"expression": "length"})),
        ])
        .await
        .unwrap();
    assert_eq!(data.payload, Payload::Structured(json!([11])));
}
