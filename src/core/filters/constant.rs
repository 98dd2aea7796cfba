use crate::core::codec;
use crate::core::data::{Data, Payload};
use crate::core::error::AppError;
use crate::core::filter::{Filter, FilterConfig};
use crate::core::types::{content_type, ErrorCategory};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Injects a literal payload. String data is decoded with `contentType`.
#[derive(Default)]
pub struct ConstantFilter {
    params: Option<ConstantParams>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConstantParams {
    #[serde(default = "default_content_type", alias = "content_type")]
    content_type: String,
    #[serde(default)]
    data: Value,
}

fn default_content_type() -> String {
    content_type::TEXT.to_string()
}

#[async_trait]
impl Filter for ConstantFilter {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn prep(&mut self, config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        let params: ConstantParams = config.parse_params()?;
        let empty = match &params.data {
            Value::Null => true,
            Value::String(text) => text.is_empty(),
            _ => false,
        };
        if empty {
            tracing::error!("constant filter requires 'data' parameter");
            return Err(AppError::new(
                ErrorCategory::MissingParams,
                "constant filter requires 'data'",
            ));
        }
        self.params = Some(params);
        Ok(())
    }

    async fn process(&mut self, _data: &Data) -> Result<Data, AppError> {
        let params = self.params.take().ok_or_else(|| {
            AppError::new(ErrorCategory::Internal, "constant filter processed before prep")
        })?;
        let payload = match params.data {
            Value::String(text) => codec::decode(&params.content_type, text.as_bytes())
                .map_err(|err| err.into_decode_failure(&params.content_type))?,
            other => Payload::Structured(other),
        };
        Ok(Data {
            content_type: params.content_type,
            payload,
        })
    }
}
