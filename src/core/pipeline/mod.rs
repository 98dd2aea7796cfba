#![allow(clippy::result_large_err)]

use crate::core::data::Data;
use crate::core::error::AppError;
use crate::core::filter::{accepts_content_type, FilterConfig, FilterRegistry};
use crate::core::types::ErrorCategory;
use std::time::Instant;

/// A failed run: the error plus the last value produced before it.
#[derive(Debug)]
pub struct PipelineFailure {
    pub error: AppError,
    pub partial: Data,
    /// Zero-based index of the failing step.
    pub step: usize,
    pub filter: String,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pipeline step {} ('{}') failed: {}",
            self.step, self.filter, self.error
        )
    }
}

impl std::error::Error for PipelineFailure {}

/// Runs filter chains against a registry. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    registry: FilterRegistry,
}

impl Pipeline {
    pub fn new(registry: FilterRegistry) -> Self {
        Self { registry }
    }

    /// Thread one value through `configs` in order, stopping at the first failure.
    pub async fn run(&self, configs: &[FilterConfig]) -> Result<Data, PipelineFailure> {
        let started = Instant::now();
        let mut data = Data::default();
        for (step, config) in configs.iter().enumerate() {
            let fail = |error: AppError, partial: Data| PipelineFailure {
                error,
                partial,
                step,
                filter: config.name.clone(),
            };

            let mut filter = match self.registry.resolve(&config.name) {
                Ok(filter) => filter,
                Err(err) => {
                    tracing::error!(step, filter = %config.name, "filter not found");
                    return Err(fail(err, data));
                }
            };

            let accepts = filter.accepts();
            if !accepts_content_type(accepts, &data.content_type) {
                tracing::error!(
                    step,
                    filter = filter.name(),
                    content_type = %data.content_type,
                    accepts = ?accepts,
                    "filter does not accept content type"
                );
                let err = AppError::new(
                    ErrorCategory::ContentTypeMismatch,
                    format!(
                        "filter '{}' does not accept content type '{}'",
                        filter.name(),
                        data.content_type
                    ),
                )
                .with_context("accepts", accepts.join(","));
                return Err(fail(err, data));
            }

            tracing::debug!(step, filter = filter.name(), content_type = %data.content_type, "prep");
            if let Err(err) = filter.prep(config, &data) {
                tracing::error!(step, filter = filter.name(), error = %err, "prep failed");
                return Err(fail(err, data));
            }

            tracing::debug!(step, filter = filter.name(), kind = data.payload.kind(), "process");
            let produced = match filter.process(&data).await {
                Ok(produced) => produced,
                Err(err) => {
                    tracing::error!(step, filter = filter.name(), error = %err, "process failed");
                    return Err(fail(err, data));
                }
            };

            tracing::debug!(step, filter = filter.name(), content_type = %produced.content_type, "post");
            if let Err(err) = filter.post(config, &produced) {
                tracing::error!(step, filter = filter.name(), error = %err, "post failed");
                return Err(fail(err, produced));
            }
            data = produced;
        }
        tracing::debug!(
            steps = configs.len(),
            content_type = %data.content_type,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );
        Ok(data)
    }
}
