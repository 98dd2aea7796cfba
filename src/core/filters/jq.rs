#![allow(clippy::result_large_err)]

use crate::core::data::Data;
use crate::core::error::AppError;
use crate::core::filter::{Filter, FilterConfig};
use crate::core::types::{content_type, ErrorCategory};
use async_trait::async_trait;
use jaq_interpret::{Ctx, Error as JqError, FilterT, ParseCtx, RcIter, Val};
use serde::Deserialize;
use serde_json::Value;

/// `halt` ends output collection without failing, through the same path as `error(null)`.
const HALT_DEF: &str = "def halt: error(null);";

/// Runs a jq expression over the structured view of the payload.
///
/// Only the expression text is kept between `prep` and `process`: compiled jaq filters hold
/// `Rc` values and are not `Send`.
#[derive(Default)]
pub struct JqFilter {
    expression: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JqParams {
    #[serde(default)]
    expression: String,
}

fn compile(expression: &str) -> Result<jaq_interpret::Filter, AppError> {
    let mut defs = ParseCtx::new(Vec::new());
    defs.insert_natives(jaq_core::core());
    defs.insert_defs(jaq_std::std());
    let (halt, _) = jaq_parse::parse(HALT_DEF, jaq_parse::defs());
    defs.insert_defs(halt.unwrap_or_default());

    let (main, errs) = jaq_parse::parse(expression, jaq_parse::main());
    let main = match main {
        Some(main) if errs.is_empty() => main,
        _ => {
            return Err(AppError::new(
                ErrorCategory::QueryFailure,
                format!("failed to parse jq expression '{}'", expression),
            )
            .with_context("errors", format!("{:?}", errs)))
        }
    };
    let filter = defs.compile(main);
    if !defs.errs.is_empty() {
        return Err(AppError::new(
            ErrorCategory::QueryFailure,
            format!(
                "jq expression '{}' has {} undefined reference(s)",
                expression,
                defs.errs.len()
            ),
        ));
    }
    Ok(filter)
}

/// Collect every output; `halt` or `error(null)` stops collection without failing.
fn evaluate(expression: &str, input: Value) -> Result<Vec<Value>, AppError> {
    let filter = compile(expression)?;
    let inputs = RcIter::new(std::iter::empty());
    let mut outputs = Vec::new();
    for item in filter.run((Ctx::new([], &inputs), Val::from(input))) {
        match item {
            Ok(val) => outputs.push(Value::from(val)),
            Err(JqError::Val(Val::Null)) => {
                tracing::debug!(expression, collected = outputs.len(), "jq halted");
                break;
            }
            Err(err) => {
                return Err(AppError::new(
                    ErrorCategory::QueryFailure,
                    format!("jq evaluation failed: {}", err),
                ))
            }
        }
    }
    Ok(outputs)
}

#[async_trait]
impl Filter for JqFilter {
    fn name(&self) -> &'static str {
        "jq"
    }

    fn prep(&mut self, config: &FilterConfig, _data: &Data) -> Result<(), AppError> {
        let params: JqParams = config.parse_params()?;
        if params.expression.trim().is_empty() {
            tracing::error!("jq filter requires 'expression' parameter");
            return Err(AppError::new(
                ErrorCategory::MissingParams,
                "jq filter requires 'expression'",
            ));
        }
        compile(&params.expression)?;
        self.expression = params.expression;
        Ok(())
    }

    async fn process(&mut self, data: &Data) -> Result<Data, AppError> {
        let outputs = evaluate(&self.expression, data.payload.to_structured())?;
        Ok(Data::new(content_type::JSON, Value::Array(outputs)))
    }
}
