use filterweb::core::filter::FilterConfig;
use filterweb::core::types::ErrorCategory;
use filterweb::core::{builtin_registry, Payload, Pipeline};
use serde_json::json;

fn pipeline() -> Pipeline {
    Pipeline::new(builtin_registry())
}

#[tokio::test]
async fn constant_text_is_raw_bytes() {
    let data = pipeline()
        .run(&[FilterConfig::new("constant", json!({"data": "hello"}))])
        .await
        .unwrap();
    assert_eq!(data.content_type, "text/plain");
    assert_eq!(data.payload, Payload::Raw(b"hello".to_vec()));
}

#[tokio::test]
async fn constant_yaml_is_decoded() {
    let data = pipeline()
        .run(&[FilterConfig::new(
            "constant",
            json!({"contentType": "application/yaml", "data": "name: Alice"}),
        )])
        .await
        .unwrap();
    assert_eq!(data.content_type, "application/yaml");
    assert_eq!(data.payload, Payload::Structured(json!({"name": "Alice"})));
}

#[tokio::test]
async fn constant_structured_literal_passes_through() {
    let data = pipeline()
        .run(&[FilterConfig::new(
            "constant",
            json!({"content_type": "application/json", "data": {"list": [1, 2]}}),
        )])
        .await
        .unwrap();
    assert_eq!(data.payload, Payload::Structured(json!({"list": [1, 2]})));
}

#[tokio::test]
async fn constant_invalid_literal_is_decode_failure() {
    let failure = pipeline()
        .run(&[FilterConfig::new(
            "constant",
            json!({"contentType": "application/json", "data": "{broken"}),
        )])
        .await
        .unwrap_err();
    assert!(failure.error.is(ErrorCategory::DecodeFailure));
}

#[tokio::test]
async fn constant_without_data_is_missing_params() {
    let failure = pipeline()
        .run(&[FilterConfig::new("constant", json!({}))])
        .await
        .unwrap_err();
    assert!(failure.error.is(ErrorCategory::MissingParams));
}

#[tokio::test]
async fn encode_converts_between_formats() {
    let data = pipeline()
        .run(&[
            FilterConfig::new(
                "constant",
                json!({"contentType": "application/json", "data": "[{\"id\": 1, \"name\": \"a\"}]"}),
            ),
            FilterConfig::new("encode", json!({"contentType": "text/csv"})),
        ])
        .await
        .unwrap();
    assert_eq!(data.content_type, "text/csv");
    assert_eq!(data.payload, Payload::Raw(b"id,name\n1,a\n".to_vec()));
}

#[tokio::test]
async fn encode_yaml_output() {
    let data = pipeline()
        .run(&[
            FilterConfig::new(
                "constant",
                json!({"contentType": "application/json", "data": "{\"name\": \"Alice\"}"}),
            ),
            FilterConfig::new("encode", json!({"contentType": "application/yaml"})),
        ])
        .await
        .unwrap();
    assert_eq!(data.payload, Payload::Raw(b"name: Alice\n".to_vec()));
}

#[tokio::test]
async fn encode_requires_content_type() {
    let failure = pipeline()
        .run(&[FilterConfig::new("encode", json!({}))])
        .await
        .unwrap_err();
    assert!(failure.error.is(ErrorCategory::MissingParams));
}

#[tokio::test]
async fn encode_csv_of_scalar_fails() {
    let failure = pipeline()
        .run(&[
            FilterConfig::new("constant", json!({"contentType": "application/json", "data": "42"})),
            FilterConfig::new("encode", json!({"contentType": "text/csv"})),
        ])
        .await
        .unwrap_err();
    assert!(failure.error.is(ErrorCategory::EncodeFailure));
    assert_eq!(failure.step, 1);
}
