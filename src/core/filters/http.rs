#![allow(clippy::result_large_err)]

use crate::core::codec;
use crate::core::data::Data;
use crate::core::error::AppError;
use crate::core::filter::{Filter, FilterConfig};
use crate::core::types::{content_type, ErrorCategory};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use url::Url;

/// Fetches a URL (over TCP or a unix socket) and decodes the response body.
#[derive(Default)]
pub struct HttpFilter {
    params: Option<HttpParams>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HttpParams {
    #[serde(default)]
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default, alias = "unix_socket")]
    unix_socket: Option<PathBuf>,
    #[serde(default = "default_verify")]
    verify: bool,
    #[serde(default = "default_expect_code", alias = "expect_code")]
    expect_code: Vec<u16>,
    #[serde(default, alias = "content_type")]
    content_type: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_verify() -> bool {
    true
}

fn default_expect_code() -> Vec<u16> {
    vec![200]
}

/// Status, raw `Content-Type` header and body of a completed request.
struct Fetched {
    status: u16,
    content_type: Option<Vec<u8>>,
    body: Vec<u8>,
}

fn request_failed<E>(message: String, err: E) -> AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    AppError::with_source(ErrorCategory::HttpRequestFailed, message, err)
}

#[async_trait]
impl Filter for HttpFilter {
    fn name(&self) -> &'static str {
        "http"
    }

    fn prep(&mut self, config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        let mut params: HttpParams = config.parse_params()?;
        if params.url.trim().is_empty() {
            tracing::error!("http filter requires 'url' parameter");
            return Err(AppError::new(
                ErrorCategory::MissingParams,
                "http filter requires 'url'",
            ));
        }
        params.method = params.method.trim().to_ascii_uppercase();
        if params.method.is_empty() {
            params.method = default_method();
        }
        self.params = Some(params);
        Ok(())
    }

    async fn process(&mut self, _data: &Data) -> Result<Data, AppError> {
        let params = self.params.take().ok_or_else(|| {
            AppError::new(ErrorCategory::Internal, "http filter processed before prep")
        })?;
        let url = Url::parse(&params.url)
            .map_err(|err| request_failed(format!("invalid url '{}': {}", params.url, err), err))?;

        let start = Instant::now();
        let fetched = match params.unix_socket {
            Some(ref socket) => fetch_unix(socket, &url, &params).await?,
            None => fetch_tcp(&url, &params).await?,
        };
        tracing::debug!(
            method = %params.method,
            url = %url,
            status = fetched.status,
            body_len = fetched.body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "http fetch completed"
        );

        if !params.expect_code.contains(&fetched.status) {
            tracing::error!(url = %url, status = fetched.status, expected = ?params.expect_code, "unexpected http status");
            return Err(AppError::new(
                ErrorCategory::HttpStatusNotOk,
                format!("{} {} returned status {}", params.method, url, fetched.status),
            )
            .with_context("status", fetched.status.to_string())
            .with_context("body", String::from_utf8_lossy(&fetched.body).into_owned()));
        }

        let resolved = match params.content_type.filter(|ct| !ct.is_empty()) {
            Some(explicit) => explicit,
            None => media_type(fetched.content_type.as_deref())?,
        };
        let payload = codec::decode(&resolved, &fetched.body)
            .map_err(|err| err.into_decode_failure(&resolved))?;
        Ok(Data {
            content_type: resolved,
            payload,
        })
    }
}

/// Media type of a `Content-Type` header with parameters stripped.
fn media_type(header: Option<&[u8]>) -> Result<String, AppError> {
    let Some(raw) = header else {
        return Ok(content_type::OCTET_STREAM.to_string());
    };
    let text = std::str::from_utf8(raw).map_err(|err| {
        AppError::with_source(
            ErrorCategory::DecodeFailure,
            "response content type is not valid UTF-8",
            err,
        )
    })?;
    let mime = mime::Mime::from_str(text).map_err(|err| {
        AppError::with_source(
            ErrorCategory::DecodeFailure,
            format!("unparsable response content type '{}'", text),
            err,
        )
    })?;
    Ok(mime.essence_str().to_ascii_lowercase())
}

async fn fetch_tcp(url: &Url, params: &HttpParams) -> Result<Fetched, AppError> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(!params.verify)
        .build()
        .map_err(|err| request_failed(format!("failed to build http client: {}", err), err))?;
    let method = reqwest::Method::from_bytes(params.method.as_bytes()).map_err(|err| {
        request_failed(format!("invalid http method '{}'", params.method), err)
    })?;

    let mut request = client.request(method, url.clone());
    for (name, value) in &params.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    let response = request
        .send()
        .await
        .map_err(|err| request_failed(format!("request to {} failed: {}", url, err), err))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .map(|value| value.as_bytes().to_vec());
    let body = response
        .bytes()
        .await
        .map_err(|err| request_failed(format!("failed to read body from {}: {}", url, err), err))?;
    Ok(Fetched {
        status,
        content_type,
        body: body.to_vec(),
    })
}

async fn fetch_unix(socket: &Path, url: &Url, params: &HttpParams) -> Result<Fetched, AppError> {
    let method = hyper::Method::from_bytes(params.method.as_bytes()).map_err(|err| {
        request_failed(format!("invalid http method '{}'", params.method), err)
    })?;
    let stream = tokio::net::UnixStream::connect(socket).await.map_err(|err| {
        request_failed(
            format!("failed to connect to {}: {}", socket.display(), err),
            err,
        )
    })?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|err| request_failed(format!("http handshake failed: {}", err), err))?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::debug!(error = %err, "unix socket connection closed with error");
        }
    });

    let target = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => "localhost".to_string(),
    };
    let mut builder = hyper::Request::builder()
        .method(method)
        .uri(target)
        .header(hyper::header::HOST, host);
    for (name, value) in &params.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let request = builder
        .body(Empty::<Bytes>::new())
        .map_err(|err| request_failed(format!("invalid request for {}: {}", url, err), err))?;

    let response = sender
        .send_request(request)
        .await
        .map_err(|err| request_failed(format!("request to {} failed: {}", url, err), err))?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(hyper::header::CONTENT_TYPE)
        .map(|value| value.as_bytes().to_vec());
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|err| request_failed(format!("failed to read body from {}: {}", url, err), err))?
        .to_bytes();
    Ok(Fetched {
        status,
        content_type,
        body: body.to_vec(),
    })
}
