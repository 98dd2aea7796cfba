#![allow(clippy::result_large_err)] // Filter trait and registry return AppError directly for structured diagnostics without boxing.

use crate::core::data::Data;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// One step of a pipeline as written in route configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub name: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl FilterConfig {
    pub fn new<T: Into<String>>(name: T, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            params,
        }
    }

    /// Deserialize `params` into a filter's typed parameter record.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|err| {
            AppError::with_source(
                ErrorCategory::InvalidParams,
                format!("invalid params for filter '{}': {}", self.name, err),
                err,
            )
        })
    }
}

/// Trait implemented by pipeline filters.
///
/// An instance lives for exactly one pipeline step: `prep` parses and validates the
/// configuration, `process` transforms the current value, `post` runs after the new value
/// has been produced.
#[async_trait]
pub trait Filter: Send {
    /// Filter name used in route configuration.
    fn name(&self) -> &'static str;

    /// Content types this filter consumes. Empty, or containing `"*"`, accepts anything.
    fn accepts(&self) -> &'static [&'static str] {
        &[]
    }

    fn prep(&mut self, config: &FilterConfig, data: &Data) -> Result<(), AppError>;

    async fn process(&mut self, data: &Data) -> Result<Data, AppError>;

    fn post(&mut self, _config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        Ok(())
    }
}

/// Whether a filter declaring `accepts` may consume `content_type`.
pub fn accepts_content_type(accepts: &[&str], content_type: &str) -> bool {
    accepts.is_empty()
        || accepts
            .iter()
            .any(|accepted| *accepted == "*" || *accepted == content_type)
}

pub type FilterFactory = Arc<dyn Fn() -> Box<dyn Filter> + Send + Sync>;

/// Registered filter summary used for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDescription {
    pub name: String,
    pub accepts: Vec<String>,
}

/// Builder used to register filters before any pipeline runs.
pub struct FilterRegistryBuilder {
    factories: HashMap<String, FilterFactory>,
}

impl Default for FilterRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRegistryBuilder {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a filter type under the name its instances report.
    pub fn register<F>(&mut self) -> &mut Self
    where
        F: Filter + Default + 'static,
    {
        let name = F::default().name();
        self.register_factory(name, || Box::new(F::default()))
    }

    /// Register an arbitrary factory. A second registration under the same name replaces the first.
    pub fn register_factory<N, Fac>(&mut self, name: N, factory: Fac) -> &mut Self
    where
        N: Into<String>,
        Fac: Fn() -> Box<dyn Filter> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            tracing::warn!(filter = %name, "filter registered twice; replacing earlier factory");
        }
        self.factories.insert(name, Arc::new(factory));
        self
    }

    pub fn build(self) -> FilterRegistry {
        FilterRegistry {
            inner: Arc::new(self.factories),
        }
    }
}

/// Immutable registry shared by concurrent pipeline runs.
#[derive(Clone)]
pub struct FilterRegistry {
    inner: Arc<HashMap<String, FilterFactory>>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRegistry {
    pub fn new() -> Self {
        FilterRegistryBuilder::new().build()
    }

    pub fn builder() -> FilterRegistryBuilder {
        FilterRegistryBuilder::new()
    }

    /// Create a fresh instance of the named filter.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Filter>, AppError> {
        let factory = self.inner.get(name).ok_or_else(|| {
            AppError::new(
                ErrorCategory::FilterNotFound,
                format!("filter '{}' is not registered", name),
            )
        })?;
        Ok(factory())
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.inner.keys().cloned().collect()
    }

    pub fn describe(&self) -> Vec<FilterDescription> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                let filter = self.resolve(&name).ok()?;
                Some(FilterDescription {
                    accepts: filter.accepts().iter().map(|ct| ct.to_string()).collect(),
                    name,
                })
            })
            .collect()
    }
}
