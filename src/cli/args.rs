use clap::Args;
use std::net::SocketAddr;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Print only each route's body, without the route and Content-Type lines
    #[arg(long)]
    pub hide_content_type: bool,
}

#[derive(Args, Debug)]
pub struct FiltersArgs {
    /// Emit the filter list as JSON or YAML
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: ListFormat,
}

#[derive(Clone, clap::ValueEnum, Debug)]
pub enum ListFormat {
    /// Pretty-printed JSON array
    Json,
    /// YAML sequence
    Yaml,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address the HTTP listener binds to
    #[arg(long, default_value = "0.0.0.0:3000", value_name = "ADDR")]
    pub listen: SocketAddr,
}
