use super::{validate_routes, ConfigError, RouteConfig};
use std::path::Path;

/// Read, parse and validate a YAML route file.
pub fn load_routes(path: &Path) -> Result<Vec<RouteConfig>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let routes = parse_routes(&content)?;
    tracing::debug!(path = %path.display(), routes = routes.len(), "loaded route config");
    Ok(routes)
}

/// Parse and validate route YAML. Methods are normalized to upper case.
pub fn parse_routes(content: &str) -> Result<Vec<RouteConfig>, ConfigError> {
    let mut routes: Vec<RouteConfig> = serde_yaml::from_str(content)?;
    for route in &mut routes {
        route.method = route.method.trim().to_ascii_uppercase();
    }
    validate_routes(&routes)?;
    Ok(routes)
}
