#![allow(clippy::result_large_err)] // Server helpers return AppError for consistent diagnostics.

//! HTTP front end: every configured route answers with the output of its pipeline.

use crate::core::codec;
use crate::core::config::RouteConfig;
use crate::core::error::AppError;
use crate::core::pipeline::Pipeline;
use crate::core::types::ErrorCategory;
use axum::{
    body::Body,
    extract::Extension,
    http::{header, HeaderValue, Method, Response, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

/// State shared across requests.
struct ServerState {
    routes: Vec<RouteConfig>,
    pipeline: Pipeline,
}

/// Start the listener and block until the service terminates (Ctrl-C stops it gracefully).
pub async fn serve(
    addr: SocketAddr,
    routes: Vec<RouteConfig>,
    pipeline: Pipeline,
) -> Result<(), AppError> {
    serve_internal(addr, routes, pipeline, None).await
}

/// Start the listener and notify once the bind address is known (test helper).
pub async fn serve_with_ready_notifier(
    addr: SocketAddr,
    routes: Vec<RouteConfig>,
    pipeline: Pipeline,
    ready_notifier: oneshot::Sender<SocketAddr>,
) -> Result<(), AppError> {
    serve_internal(addr, routes, pipeline, Some(ready_notifier)).await
}

async fn serve_internal(
    addr: SocketAddr,
    routes: Vec<RouteConfig>,
    pipeline: Pipeline,
    ready_notifier: Option<oneshot::Sender<SocketAddr>>,
) -> Result<(), AppError> {
    let route_count = routes.len();
    let router = router(routes, pipeline);
    let listener = TcpListener::bind(addr).await.map_err(|err| {
        AppError::with_source(
            ErrorCategory::Io,
            format!("failed to bind listener {}: {}", addr, err),
            err,
        )
    })?;
    let local_addr = listener.local_addr().map_err(|err| {
        AppError::with_source(
            ErrorCategory::Io,
            format!("failed to determine listener address: {}", err),
            err,
        )
    })?;
    if let Some(tx) = ready_notifier {
        let _ = tx.send(local_addr);
    }
    info!(addr = %local_addr, routes = route_count, "server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            AppError::with_source(
                ErrorCategory::Io,
                format!("server terminated: {}", err),
                err,
            )
        })
}

/// Router answering every request through the route table.
pub fn router(routes: Vec<RouteConfig>, pipeline: Pipeline) -> Router {
    let state = Arc::new(ServerState { routes, pipeline });
    Router::new()
        .fallback(handle_request)
        .layer(Extension(state))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn handle_request(
    Extension(state): Extension<Arc<ServerState>>,
    method: Method,
    uri: Uri,
) -> Response<Body> {
    let started = Instant::now();
    let path = uri.path();
    let response = match state
        .routes
        .iter()
        .find(|route| route.matches(method.as_str(), path))
    {
        Some(route) => run_route(&state.pipeline, route).await,
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    };
    info!(
        method = %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    response
}

async fn run_route(pipeline: &Pipeline, route: &RouteConfig) -> Response<Body> {
    let data = match pipeline.run(&route.filters).await {
        Ok(data) => data,
        Err(failure) => {
            tracing::error!(
                method = %route.method,
                path = %route.path,
                step = failure.step,
                filter = %failure.filter,
                code = %failure.error.code,
                error = %failure.error,
                "pipeline failed"
            );
            return internal_error();
        }
    };
    let body = match codec::externalize(&data) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(path = %route.path, error = %err, "failed to encode response");
            return internal_error();
        }
    };
    let mut response = Response::new(Body::from(body));
    if !data.content_type.is_empty() {
        let value = HeaderValue::from_str(&data.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

fn internal_error() -> Response<Body> {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
