use crate::core::codec;
use crate::core::data::{Data, Payload};
use crate::core::error::AppError;
use crate::core::filter::{Filter, FilterConfig};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::Deserialize;

/// Serializes the current payload into bytes of the configured content type.
#[derive(Default)]
pub struct EncodeFilter {
    content_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EncodeParams {
    #[serde(default, alias = "content_type")]
    content_type: String,
}

#[async_trait]
impl Filter for EncodeFilter {
    fn name(&self) -> &'static str {
        "encode"
    }

    fn prep(&mut self, config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        let params: EncodeParams = config.parse_params()?;
        if params.content_type.trim().is_empty() {
            tracing::error!("encode filter requires 'contentType' parameter");
            return Err(AppError::new(
                ErrorCategory::MissingParams,
                "encode filter requires 'contentType'",
            ));
        }
        self.content_type = params.content_type;
        Ok(())
    }

    async fn process(&mut self, data: &Data) -> Result<Data, AppError> {
        let bytes = codec::encode(&self.content_type, &data.payload)
            .map_err(|err| err.into_encode_failure(&self.content_type))?;
        Ok(Data {
            content_type: self.content_type.clone(),
            payload: Payload::Raw(bytes),
        })
    }
}
