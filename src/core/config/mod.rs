//! Route configuration: which pipeline answers which `METHOD PATH`.

mod loader;
mod validation;

pub use loader::{load_routes, parse_routes};
pub use validation::validate_routes;

use crate::core::filter::FilterConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One served route and the pipeline that produces its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RouteConfig {
    /// Whether this route answers `method` on `path` (exact match, method case-insensitive).
    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.path == path && self.method.eq_ignore_ascii_case(method)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse route config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("route #{index}: {message}")]
    Invalid { index: usize, message: String },
}
