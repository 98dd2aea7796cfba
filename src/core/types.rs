use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    FilterNotFound,
    ContentTypeMismatch,
    HttpRequestFailed,
    HttpStatusNotOk,
    MissingParams,
    InvalidParams,
    UnsupportedTemplateType,
    EncodeFailure,
    DecodeFailure,
    CommandFailed,
    TemplateFailure,
    QueryFailure,
    Io,
    Internal,
}

impl ErrorCategory {
    /// Stable default code attached to errors of this category.
    pub fn default_code(self) -> &'static str {
        match self {
            ErrorCategory::FilterNotFound => "FW-REG-001",
            ErrorCategory::ContentTypeMismatch => "FW-PIPE-001",
            ErrorCategory::HttpRequestFailed => "FW-HTTP-001",
            ErrorCategory::HttpStatusNotOk => "FW-HTTP-002",
            ErrorCategory::MissingParams => "FW-PARAM-001",
            ErrorCategory::InvalidParams => "FW-PARAM-002",
            ErrorCategory::UnsupportedTemplateType => "FW-TPL-001",
            ErrorCategory::EncodeFailure => "FW-CODEC-001",
            ErrorCategory::DecodeFailure => "FW-CODEC-002",
            ErrorCategory::CommandFailed => "FW-CMD-001",
            ErrorCategory::TemplateFailure => "FW-TPL-002",
            ErrorCategory::QueryFailure => "FW-JQ-001",
            ErrorCategory::Io => "FW-IO-001",
            ErrorCategory::Internal => "FW-INT-001",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Media types the codec understands structurally.
pub mod content_type {
    pub const JSON: &str = "application/json";
    pub const YAML: &str = "application/yaml";
    pub const TEXT_YAML: &str = "text/yaml";
    pub const XML: &str = "application/xml";
    pub const TEXT_XML: &str = "text/xml";
    pub const CSV: &str = "text/csv";
    pub const DOTENV: &str = "text/dotenv";
    pub const TEXT: &str = "text/plain";
    pub const HTML: &str = "text/html";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}
