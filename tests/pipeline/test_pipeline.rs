use async_trait::async_trait;
use filterweb::core::error::AppError;
use filterweb::core::filter::{Filter, FilterConfig, FilterRegistry, FilterRegistryBuilder};
use filterweb::core::filters::{self, command, BuiltinFilterDeps};
use filterweb::core::pipeline::Pipeline;
use filterweb::core::types::ErrorCategory;
use filterweb::core::{Data, Payload};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
struct Calls {
    prep: Arc<AtomicBool>,
    process: Arc<AtomicBool>,
}

/// Records lifecycle calls and only admits JSON.
struct JsonOnly {
    calls: Calls,
}

#[async_trait]
impl Filter for JsonOnly {
    fn name(&self) -> &'static str {
        "json_only"
    }

    fn accepts(&self) -> &'static [&'static str] {
        &["application/json"]
    }

    fn prep(&mut self, _config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        self.calls.prep.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn process(&mut self, data: &Data) -> Result<Data, AppError> {
        self.calls.process.store(true, Ordering::SeqCst);
        Ok(data.clone())
    }
}

/// Produces a value and then rejects it in `post`.
#[derive(Default)]
struct RejectInPost;

#[async_trait]
impl Filter for RejectInPost {
    fn name(&self) -> &'static str {
        "reject_in_post"
    }

    fn prep(&mut self, _config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        Ok(())
    }

    async fn process(&mut self, _data: &Data) -> Result<Data, AppError> {
        Ok(Data::new("text/plain", "produced".to_string()))
    }

    fn post(&mut self, _config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        Err(AppError::new(ErrorCategory::Internal, "rejected"))
    }
}

struct CountingRunner {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl command::CommandRunner for CountingRunner {
    async fn run(
        &self,
        _request: &command::CommandExecutionRequest,
    ) -> Result<command::CommandExecutionOutput, AppError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(command::CommandExecutionOutput {
            stdout: b"ran".to_vec(),
            stderr: Vec::new(),
            exit_code: 0,
        })
    }
}

fn builder_with_builtins() -> FilterRegistryBuilder {
    let mut builder = FilterRegistry::builder();
    filters::register_builtins(&mut builder);
    builder
}

fn constant(content_type: &str, data: serde_json::Value) -> FilterConfig {
    FilterConfig::new("constant", json!({"contentType": content_type, "data": data}))
}

#[tokio::test]
async fn empty_pipeline_yields_empty_value() {
    let pipeline = Pipeline::new(builder_with_builtins().build());
    let data = pipeline.run(&[]).await.unwrap();
    assert_eq!(data, Data::default());
}

#[tokio::test]
async fn content_type_mismatch_skips_prep_and_process() {
    let calls = Calls::default();
    let mut builder = builder_with_builtins();
    let observed = calls.clone();
    builder.register_factory("json_only", move || {
        Box::new(JsonOnly {
            calls: observed.clone(),
        })
    });
    let pipeline = Pipeline::new(builder.build());

    let failure = pipeline
        .run(&[
            constant("text/plain", json!("hello")),
            FilterConfig::new("json_only", json!({})),
        ])
        .await
        .unwrap_err();

    assert!(failure.error.is(ErrorCategory::ContentTypeMismatch));
    assert_eq!(failure.step, 1);
    assert_eq!(failure.filter, "json_only");
    assert_eq!(failure.partial.content_type, "text/plain");
    assert!(!calls.prep.load(Ordering::SeqCst));
    assert!(!calls.process.load(Ordering::SeqCst));
}

#[tokio::test]
async fn accepted_content_type_runs_lifecycle() {
    let calls = Calls::default();
    let mut builder = builder_with_builtins();
    let observed = calls.clone();
    builder.register_factory("json_only", move || {
        Box::new(JsonOnly {
            calls: observed.clone(),
        })
    });
    let pipeline = Pipeline::new(builder.build());

    let data = pipeline
        .run(&[
            constant("application/json", json!(r#"{"a": 1}"#)),
            FilterConfig::new("json_only", json!({})),
        ])
        .await
        .unwrap();

    assert_eq!(data.payload, Payload::Structured(json!({"a": 1})));
    assert!(calls.prep.load(Ordering::SeqCst));
    assert!(calls.process.load(Ordering::SeqCst));
}

#[tokio::test]
async fn process_failure_keeps_the_step_input() {
    let pipeline = Pipeline::new(builder_with_builtins().build());
    let failure = pipeline
        .run(&[
            constant("application/json", json!(r#"{"n": "x"}"#)),
            FilterConfig::new("jq", json!({"expression": ".n + 1"})),
        ])
        .await
        .unwrap_err();
    assert!(failure.error.is(ErrorCategory::QueryFailure));
    assert_eq!(failure.step, 1);
    assert_eq!(failure.partial.content_type, "application/json");
    assert_eq!(failure.partial.payload, Payload::Structured(json!({"n": "x"})));
}

#[tokio::test]
async fn unknown_filter_keeps_previous_value() {
    let pipeline = Pipeline::new(builder_with_builtins().build());
    let failure = pipeline
        .run(&[
            constant("text/plain", json!("kept")),
            FilterConfig::new("nope", json!({})),
        ])
        .await
        .unwrap_err();
    assert!(failure.error.is(ErrorCategory::FilterNotFound));
    assert_eq!(failure.partial.payload, Payload::Raw(b"kept".to_vec()));
}

#[tokio::test]
async fn post_failure_reports_produced_value() {
    let mut builder = builder_with_builtins();
    builder.register::<RejectInPost>();
    let pipeline = Pipeline::new(builder.build());
    let failure = pipeline
        .run(&[FilterConfig::new("reject_in_post", json!({}))])
        .await
        .unwrap_err();
    assert_eq!(failure.step, 0);
    assert_eq!(failure.partial.payload, Payload::Text("produced".to_string()));
}

#[tokio::test]
async fn missing_param_has_no_side_effect() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut builder = FilterRegistry::builder();
    filters::register_builtins_with_deps(
        &mut builder,
        BuiltinFilterDeps {
            command_runner: Some(Arc::new(CountingRunner { runs: runs.clone() })),
        },
    );
    let pipeline = Pipeline::new(builder.build());

    let failure = pipeline
        .run(&[FilterConfig::new("command", json!({"args": []}))])
        .await
        .unwrap_err();
    assert!(failure.error.is(ErrorCategory::MissingParams));
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    let data = pipeline
        .run(&[FilterConfig::new("command", json!({"args": ["anything"]}))])
        .await
        .unwrap();
    assert_eq!(data.payload, Payload::Raw(b"ran".to_vec()));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn yaml_constant_feeds_template() {
    let pipeline = Pipeline::new(builder_with_builtins().build());
    let data = pipeline
        .run(&[
            constant("application/yaml", json!("name: Alice\n")),
            FilterConfig::new("template", json!({"content": "Hello {{name}}"})),
        ])
        .await
        .unwrap();
    assert_eq!(data.content_type, "text/plain");
    assert_eq!(data.payload, Payload::Text("Hello Alice".to_string()));
}

#[tokio::test]
async fn concurrent_runs_use_independent_instances() {
    let pipeline = Pipeline::new(builder_with_builtins().build());
    let configs = vec![
        constant("application/json", json!(r#"[1, 2, 3]"#)),
        FilterConfig::new("jq", json!({"expression": ".[] * 10"})),
    ];
    let runs = (0..8).map(|_| {
        let pipeline = pipeline.clone();
        let configs = configs.clone();
        tokio::spawn(async move { pipeline.run(&configs).await })
    });
    for handle in runs {
        let data = handle.await.unwrap().unwrap();
        assert_eq!(data.payload, Payload::Structured(json!([10, 20, 30])));
    }
}
