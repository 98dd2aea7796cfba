pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod filters;
pub mod pipeline;
pub mod types;

pub use config::{load_routes, ConfigError, RouteConfig};
pub use data::{Data, Payload};
pub use error::AppError;
pub use filter::{Filter, FilterConfig, FilterDescription, FilterRegistry, FilterRegistryBuilder};
pub use pipeline::{Pipeline, PipelineFailure};
pub use types::*;

/// Registry holding every built-in filter.
pub fn builtin_registry() -> FilterRegistry {
    let mut builder = FilterRegistry::builder();
    filters::register_builtins(&mut builder);
    builder.build()
}
