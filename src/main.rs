use clap::Parser;
use filterweb::cli::{self, Args};
use filterweb::logging::{self, config::LoggingConfig};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let logging_config = match LoggingConfig::load(args.verbose, args.quiet, args.text_log) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = logging::init(&logging_config) {
        eprintln!("error: {:#}", err);
        return ExitCode::FAILURE;
    }

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("command failed: {:#}", err);
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
