use crate::logging::layers::console::{ConsoleOutput, LogFormat};
use crate::Result;
use anyhow::anyhow;
use std::env;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";

/// Resolved logging configuration after applying CLI flags and env overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub default_level: String,
    pub format: LogFormat,
    pub console_output: ConsoleOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: DEFAULT_LEVEL.to_string(),
            format: LogFormat::default(),
            console_output: ConsoleOutput::default(),
        }
    }
}

impl LoggingConfig {
    /// Precedence: defaults, then CLI flags, then `FILTERWEB_LOG_FORMAT` / `FILTERWEB_LOG_OUTPUT`.
    pub fn load(verbose: bool, quiet: bool, text: bool) -> Result<Self> {
        let mut config = Self::from_flags(verbose, quiet, text);
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_flags(verbose: bool, quiet: bool, text: bool) -> Self {
        let default_level = if verbose {
            "debug"
        } else if quiet {
            "warn"
        } else {
            DEFAULT_LEVEL
        };
        Self {
            default_level: default_level.to_string(),
            format: if text { LogFormat::Text } else { LogFormat::Json },
            console_output: ConsoleOutput::Stderr,
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(format) = non_empty_var("FILTERWEB_LOG_FORMAT") {
            self.format = LogFormat::from_str(&format).map_err(|err| anyhow!(err))?;
        }
        if let Some(output) = non_empty_var("FILTERWEB_LOG_OUTPUT") {
            self.console_output = ConsoleOutput::from_str(&output).map_err(|err| anyhow!(err))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.default_level)
            .map_err(|_| anyhow!("log level must be a valid tracing directive"))?;
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
