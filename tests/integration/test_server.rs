use anyhow::Result;
use filterweb::core::config::{parse_routes, RouteConfig};
use filterweb::core::error::AppError;
use filterweb::core::types::ErrorCategory;
use filterweb::core::{builtin_registry, Pipeline};
use filterweb::server;
use reqwest::StatusCode;
use std::net::SocketAddr;
use tokio::{sync::oneshot, task::JoinHandle};

const ROUTES: &str = r#"
- path: /hello
  filters:
    - name: constant
      params:
        contentType: application/json
        data: '{"name": "Alice"}'
    - name: template
      params:
        content: "Hello {{name}}"
- path: /data
  method: POST
  filters:
    - name: constant
      params:
        contentType: application/yaml
        data: "items: [1, 2]"
- path: /broken
  filters:
    - name: constant
      params:
        data: plain
    - name: jq
      params:
        expression: ".missing"
"#;

async fn spawn_server(
    routes: Vec<RouteConfig>,
) -> Result<(SocketAddr, JoinHandle<Result<(), AppError>>)> {
    let pipeline = Pipeline::new(builtin_registry());
    let (addr_tx, addr_rx) = oneshot::channel();
    let bind: SocketAddr = "127.0.0.1:0".parse()?;
    let handle = tokio::spawn(async move {
        server::serve_with_ready_notifier(bind, routes, pipeline, addr_tx).await
    });
    let addr = addr_rx.await.map_err(|_| {
        AppError::new(
            ErrorCategory::Internal,
            "server startup canceled before bind address reported",
        )
    })?;
    Ok((addr, handle))
}

#[tokio::test]
async fn routes_answer_with_pipeline_output() -> Result<()> {
    let (addr, handle) = spawn_server(parse_routes(ROUTES)?).await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("http://{}/hello", addr)).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await?, "Hello Alice");

    let response = client.post(format!("http://{}/data", addr)).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/yaml");
    assert_eq!(response.text().await?, "items:\n- 1\n- 2\n");

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn unknown_route_or_method_is_not_found() -> Result<()> {
    let (addr, handle) = spawn_server(parse_routes(ROUTES)?).await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("http://{}/nope", addr)).send().await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await?, "not found");

    let response = client.get(format!("http://{}/data", addr)).send().await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn failing_pipeline_is_internal_error() -> Result<()> {
    let (addr, handle) = spawn_server(parse_routes(ROUTES)?).await?;
    let response = reqwest::get(format!("http://{}/broken", addr)).await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await?, "Internal Server Error");
    handle.abort();
    Ok(())
}
