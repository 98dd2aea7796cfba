//! Content-type codec: the single conversion boundary between bytes and payloads.
//!
//! Structured content types (`application/json`, `application/yaml`, `text/yaml`,
//! `application/xml`, `text/xml`, `text/csv`) decode into [`Payload::Structured`]; every
//! other content type is opaque and passes through as [`Payload::Raw`].

mod csv_rows;
mod xml_tree;

use crate::core::data::{Data, Payload};
use crate::core::error::AppError;
use crate::core::types::{content_type as ct, ErrorCategory};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid XML: {0}")]
    Xml(String),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Shape(String),
}

impl CodecError {
    pub fn into_decode_failure(self, content_type: &str) -> AppError {
        let message = format!("failed to decode {}: {}", content_type, self);
        AppError::with_source(ErrorCategory::DecodeFailure, message, self)
            .with_context("content_type", content_type)
    }

    pub fn into_encode_failure(self, content_type: &str) -> AppError {
        let message = format!("failed to encode {}: {}", content_type, self);
        AppError::with_source(ErrorCategory::EncodeFailure, message, self)
            .with_context("content_type", content_type)
    }
}

/// Decode `bytes` according to `content_type`.
pub fn decode(content_type: &str, bytes: &[u8]) -> Result<Payload, CodecError> {
    tracing::debug!(content_type, len = bytes.len(), "decoding payload");
    let payload = match content_type {
        ct::JSON => Payload::Structured(serde_json::from_slice::<Value>(bytes)?),
        ct::YAML | ct::TEXT_YAML => {
            Payload::Structured(serde_yaml::from_slice::<Value>(bytes)?)
        }
        ct::XML | ct::TEXT_XML => Payload::Structured(xml_tree::decode(bytes)?),
        ct::CSV => Payload::Structured(csv_rows::decode(bytes)?),
        _ => Payload::Raw(bytes.to_vec()),
    };
    tracing::debug!(content_type, kind = payload.kind(), "decoded payload");
    Ok(payload)
}

/// Encode `payload` into bytes of `content_type`.
pub fn encode(content_type: &str, payload: &Payload) -> Result<Vec<u8>, CodecError> {
    tracing::debug!(content_type, kind = payload.kind(), "encoding payload");
    let bytes = match content_type {
        ct::JSON => serde_json::to_vec(payload.structured_view().as_ref())?,
        ct::YAML | ct::TEXT_YAML => {
            serde_yaml::to_string(payload.structured_view().as_ref())?.into_bytes()
        }
        ct::XML | ct::TEXT_XML => {
            xml_tree::encode(payload.structured_view().as_ref())?
        }
        ct::CSV => match payload {
            Payload::Structured(value) => csv_rows::encode(value)?,
            other => {
                return Err(CodecError::Shape(format!(
                    "csv encoding requires structured rows, got {} payload",
                    other.kind()
                )))
            }
        },
        _ => match payload {
            Payload::Raw(bytes) => bytes.clone(),
            other => other.to_text().into_owned().into_bytes(),
        },
    };
    tracing::debug!(content_type, len = bytes.len(), "encoded payload");
    Ok(bytes)
}

/// Bytes handed to the outside world for a finished value.
///
/// Raw and text payloads are written as they are; structured payloads go through [`encode`].
pub fn externalize(data: &Data) -> Result<Vec<u8>, AppError> {
    match data.payload {
        Payload::Raw(ref bytes) => Ok(bytes.clone()),
        Payload::Text(ref text) => Ok(text.as_bytes().to_vec()),
        Payload::Structured(_) => encode(&data.content_type, &data.payload)
            .map_err(|err| err.into_encode_failure(&data.content_type)),
    }
}
