pub mod command;
pub mod constant;
pub mod encode;
pub mod http;
pub mod jq;
pub mod template;

use crate::core::filter::FilterRegistryBuilder;
use std::sync::Arc;

#[derive(Default)]
pub struct BuiltinFilterDeps {
    /// Process runner for the command filter. Defaults to spawning through tokio.
    pub command_runner: Option<Arc<dyn command::CommandRunner>>,
}

/// Register the built-in filters into the supplied builder.
pub fn register_builtins(builder: &mut FilterRegistryBuilder) {
    register_builtins_with_deps(builder, BuiltinFilterDeps::default());
}

pub fn register_builtins_with_deps(builder: &mut FilterRegistryBuilder, deps: BuiltinFilterDeps) {
    builder
        .register::<constant::ConstantFilter>()
        .register::<encode::EncodeFilter>()
        .register::<http::HttpFilter>()
        .register::<jq::JqFilter>()
        .register::<template::TemplateFilter>();
    match deps.command_runner {
        Some(runner) => builder.register_factory("command", move || {
            Box::new(command::CommandFilter::with_runner(runner.clone()))
        }),
        None => builder.register::<command::CommandFilter>(),
    };
}
