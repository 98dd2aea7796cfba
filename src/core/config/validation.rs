use super::{ConfigError, RouteConfig};
use std::collections::HashSet;

pub fn validate_routes(routes: &[RouteConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (index, route) in routes.iter().enumerate() {
        let invalid = |message: String| ConfigError::Invalid { index, message };
        if !route.path.starts_with('/') {
            return Err(invalid(format!("path '{}' must start with '/'", route.path)));
        }
        if route.method.is_empty() || !route.method.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid(format!("invalid method '{}'", route.method)));
        }
        if route.filters.is_empty() {
            return Err(invalid(format!("{} {} has no filters", route.method, route.path)));
        }
        if let Some(step) = route.filters.iter().position(|f| f.name.trim().is_empty()) {
            return Err(invalid(format!("filter #{} has no name", step)));
        }
        if !seen.insert((route.method.to_ascii_uppercase(), route.path.as_str())) {
            return Err(invalid(format!("duplicate route {} {}", route.method, route.path)));
        }
    }
    Ok(())
}
