use crate::cli::args::{CheckArgs, FiltersArgs, ListFormat, ServeArgs};
use crate::core::{builtin_registry, codec, config, Pipeline};
use crate::Result;
use anyhow::{anyhow, Context};
use std::io::Write;
use std::path::Path;

pub async fn check(config_path: &Path, args: CheckArgs) -> Result<()> {
    let routes = config::load_routes(config_path)
        .with_context(|| format!("failed to load routes from {}", config_path.display()))?;
    let pipeline = Pipeline::new(builtin_registry());
    let mut stdout = std::io::stdout();
    let mut failed = 0usize;

    for route in &routes {
        if !args.hide_content_type {
            writeln!(stdout, "{} {}", route.method, route.path)?;
        }
        let rendered = match pipeline.run(&route.filters).await {
            Ok(data) => codec::externalize(&data).map(|body| (data.content_type, body)),
            Err(failure) => Err(failure.error),
        };
        match rendered {
            Ok((content_type, body)) => {
                if !args.hide_content_type {
                    writeln!(stdout, "Content-Type: {}", content_type)?;
                }
                stdout.write_all(&body)?;
                writeln!(stdout)?;
            }
            Err(err) => {
                failed += 1;
                tracing::error!(method = %route.method, path = %route.path, code = %err.code, "route check failed");
                eprintln!("{} {} failed: {}", route.method, route.path, err);
            }
        }
    }
    stdout.flush()?;

    if failed > 0 {
        return Err(anyhow!("{} of {} route(s) failed", failed, routes.len()));
    }
    Ok(())
}

pub fn filters(args: FiltersArgs) -> Result<()> {
    let descriptions = builtin_registry().describe();
    let rendered = match args.format {
        ListFormat::Json => serde_json::to_string_pretty(&descriptions)?,
        ListFormat::Yaml => serde_yaml::to_string(&descriptions)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

pub async fn serve(config_path: &Path, args: ServeArgs) -> Result<()> {
    let routes = config::load_routes(config_path)
        .with_context(|| format!("failed to load routes from {}", config_path.display()))?;
    let pipeline = Pipeline::new(builtin_registry());
    crate::server::serve(args.listen, routes, pipeline).await?;
    Ok(())
}
