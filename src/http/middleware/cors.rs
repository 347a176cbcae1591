//! Cross-origin policy.
//!
//! Preflight requests are answered by the layer itself. Origins outside the
//! allow-list get no `Access-Control-Allow-*` grants, so browsers refuse the
//! response.

use std::time::Duration;

use axum::http::{request::Parts, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// Origin allow-list. A pattern ending in `*` matches by prefix.
#[derive(Debug, Clone)]
pub struct OriginPatterns {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl OriginPatterns {
    pub fn new(patterns: &[String]) -> Self {
        let mut exact = Vec::new();
        let mut prefixes = Vec::new();
        for pattern in patterns {
            let pattern = pattern.trim().to_ascii_lowercase();
            match pattern.strip_suffix('*') {
                Some(prefix) => prefixes.push(prefix.to_string()),
                None => exact.push(pattern),
            }
        }
        Self { exact, prefixes }
    }

    pub fn matches(&self, origin: &HeaderValue) -> bool {
        let Ok(origin) = origin.to_str() else {
            return false;
        };
        let origin = origin.to_ascii_lowercase();
        self.exact.iter().any(|o| *o == origin)
            || self.prefixes.iter().any(|p| origin.starts_with(p.as_str()))
    }
}

/// Build the CORS layer from configuration. Unparseable entries are skipped.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let patterns = OriginPatterns::new(&config.allowed_origins);

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    let headers: Vec<HeaderName> = parse_header_names(&config.allowed_headers);
    let exposed: Vec<HeaderName> = parse_header_names(&config.exposed_headers);

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| patterns.matches(origin),
        ))
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(exposed)
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
}

fn parse_header_names(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter_map(|name| {
            let parsed = HeaderName::from_bytes(name.as_bytes());
            if parsed.is_err() {
                tracing::warn!(header = %name, "Ignoring invalid CORS header name");
            }
            parsed.ok()
        })
        .collect()
}
