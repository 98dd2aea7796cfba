pub mod args;
pub mod commands;

pub use args::{CheckArgs, FiltersArgs, ListFormat, ServeArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "filterweb")]
#[command(version = crate::VERSION)]
#[command(about = "Serve HTTP responses synthesized by declarative filter pipelines")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: write routes in filterweb.yaml, run `filterweb check`, then `filterweb serve`."
)]
pub struct Args {
    /// Log at debug level
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Human-readable log lines instead of JSON
    #[arg(long, global = true)]
    pub text_log: bool,

    /// Route configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "FILTERWEB_CONFIG",
        default_value = "filterweb.yaml",
        value_name = "FILE"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Run every route once and print its output",
        long_about = "Check executes each configured pipeline outside the server and prints the method, path, content type and encoded body. Exits non-zero if any route fails.",
        after_help = "Example:\n    filterweb -c routes.yaml check --hide-content-type"
    )]
    Check(CheckArgs),
    #[command(
        about = "List registered filters",
        long_about = "Filters prints every built-in filter with the content types it accepts (empty means any).",
        after_help = "Example:\n    filterweb filters --format yaml"
    )]
    Filters(FiltersArgs),
    #[command(
        about = "Serve the configured routes over HTTP",
        long_about = "Serve answers each configured METHOD PATH with the output of its pipeline; unknown routes get 404, failing pipelines 500.",
        after_help = "Example:\n    filterweb serve --listen 127.0.0.1:8080"
    )]
    Serve(ServeArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Check(check_args) => commands::check(&args.config, check_args).await,
        Command::Filters(filters_args) => commands::filters(filters_args),
        Command::Serve(serve_args) => commands::serve(&args.config, serve_args).await,
    }
}
