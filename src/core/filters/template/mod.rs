#![allow(clippy::result_large_err)]

mod helpers;

use crate::core::data::Data;
use crate::core::error::AppError;
use crate::core::filter::{Filter, FilterConfig};
use crate::core::types::{content_type, ErrorCategory};
use async_trait::async_trait;
use handlebars::Handlebars;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

const TEMPLATE_NAME: &str = "template";

const ACCEPTS: &[&str] = &[
    content_type::JSON,
    content_type::YAML,
    content_type::TEXT_YAML,
    content_type::TEXT_XML,
    content_type::XML,
    content_type::DOTENV,
];

/// Renders a Handlebars template against the decoded payload.
#[derive(Default)]
pub struct TemplateFilter {
    state: Option<Prepared>,
}

struct Prepared {
    handlebars: Handlebars<'static>,
    content_type: String,
    vars: Map<String, Value>,
    base_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TemplateParams {
    #[serde(default = "default_type", rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default, alias = "content_type")]
    content_type: Option<String>,
    #[serde(default)]
    vars: Map<String, Value>,
    #[serde(default, alias = "base_key")]
    base_key: Option<String>,
}

fn default_type() -> String {
    "text".to_string()
}

impl TemplateParams {
    fn source(&self) -> Result<String, AppError> {
        if let Some(content) = self.content.as_ref().filter(|content| !content.is_empty()) {
            return Ok(content.clone());
        }
        match self.file {
            Some(ref path) => std::fs::read_to_string(path).map_err(|err| {
                AppError::with_source(
                    ErrorCategory::Io,
                    format!("failed to read template file {}", path.display()),
                    err,
                )
            }),
            None => {
                tracing::error!("template filter requires 'content' or 'file' parameter");
                Err(AppError::new(
                    ErrorCategory::MissingParams,
                    "template filter requires 'content' or 'file'",
                ))
            }
        }
    }
}

#[async_trait]
impl Filter for TemplateFilter {
    fn name(&self) -> &'static str {
        "template"
    }

    fn accepts(&self) -> &'static [&'static str] {
        ACCEPTS
    }

    fn prep(&mut self, config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        let params: TemplateParams = config.parse_params()?;
        let mut handlebars = Handlebars::new();
        let default_content_type = match params.kind.as_str() {
            "text" => {
                handlebars.register_escape_fn(handlebars::no_escape);
                content_type::TEXT
            }
            "html" => content_type::HTML,
            other => {
                return Err(AppError::new(
                    ErrorCategory::UnsupportedTemplateType,
                    format!("unsupported template type '{}'", other),
                ))
            }
        };
        let source = params.source()?;
        helpers::register(&mut handlebars);
        handlebars
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::TemplateFailure,
                    format!("failed to parse template: {}", err),
                )
            })?;

        self.state = Some(Prepared {
            handlebars,
            content_type: params
                .content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or_else(|| default_content_type.to_string()),
            vars: params.vars,
            base_key: params.base_key.filter(|key| !key.is_empty()),
        });
        Ok(())
    }

    async fn process(&mut self, data: &Data) -> Result<Data, AppError> {
        let state = self.state.take().ok_or_else(|| {
            AppError::new(ErrorCategory::Internal, "template filter processed before prep")
        })?;

        let mut value = data.payload.to_structured();
        if let Some(key) = state.base_key {
            let mut wrapped = Map::new();
            wrapped.insert(key, value);
            value = Value::Object(wrapped);
        }
        match value {
            Value::Object(ref mut map) => map.extend(state.vars),
            _ if !state.vars.is_empty() => {
                tracing::warn!(
                    content_type = %data.content_type,
                    "template input is not a mapping; vars not merged"
                );
            }
            _ => {}
        }

        let rendered = state
            .handlebars
            .render(TEMPLATE_NAME, &value)
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::TemplateFailure,
                    format!("failed to render template: {}", err),
                )
            })?;
        Ok(Data::new(state.content_type, rendered))
    }
}
