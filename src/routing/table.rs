//! Route table: registration, lookup, and freezing into an axum router.
//!
//! # Responsibilities
//! - Store (method, path) → capability bindings
//! - Reject duplicate bindings at registration
//! - Resolve a request to a capability, or an explicit miss
//!
//! # Design Decisions
//! - Immutable once frozen (lock-free concurrent lookups)
//! - Exact path matching; the gateway has no parameterised routes
//! - Explicit 404/405 distinction rather than a silent default

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use thiserror::Error;

use crate::dispatch::{Capability, Dispatcher};
use crate::http::handler::handle_capability;
use crate::http::response::ApiResponse;

/// One registered binding.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub capability: Capability,
    filter: MethodFilter,
}

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route {method} {path} is already registered")]
    Duplicate { method: Method, path: String },

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(Method),

    #[error("path '{0}' must start with '/'")]
    InvalidPath(String),
}

/// A request that matched no route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteNotFound {
    #[error("no route for {0}")]
    Path(String),

    #[error("method {method} not allowed for {path}")]
    Method { method: Method, path: String },
}

impl RouteNotFound {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteNotFound::Path(_) => StatusCode::NOT_FOUND,
            RouteNotFound::Method { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for RouteNotFound {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Route lookup missed");
        ApiResponse::failure(self.to_string()).with_status(self.status())
    }
}

/// Routes registered at boot.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `method path` to `capability`.
    pub fn register(
        &mut self,
        method: Method,
        path: impl Into<String>,
        capability: Capability,
    ) -> Result<(), RouteError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath(path));
        }
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| RouteError::UnsupportedMethod(method.clone()))?;
        if self.routes.iter().any(|r| r.method == method && r.path == path) {
            return Err(RouteError::Duplicate { method, path });
        }

        self.routes.push(Route {
            method,
            path,
            capability,
            filter,
        });
        Ok(())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolve a method and path to the bound capability.
    pub fn lookup(&self, method: &Method, path: &str) -> Result<Capability, RouteNotFound> {
        let mut path_known = false;
        for route in self.routes.iter().filter(|r| r.path == path) {
            path_known = true;
            if route.method == *method {
                return Ok(route.capability);
            }
        }

        if path_known {
            Err(RouteNotFound::Method {
                method: method.clone(),
                path: path.to_string(),
            })
        } else {
            Err(RouteNotFound::Path(path.to_string()))
        }
    }

    /// Freeze the table into an axum router dispatching through `Dispatcher`.
    pub fn into_router(self) -> Router<Arc<Dispatcher>> {
        let mut by_path: BTreeMap<String, MethodRouter<Arc<Dispatcher>>> = BTreeMap::new();

        for route in self.routes {
            let capability = route.capability;
            let handler = move |State(dispatcher): State<Arc<Dispatcher>>, request: Request| {
                handle_capability(dispatcher, capability, request)
            };
            let methods = by_path.remove(&route.path).unwrap_or_else(MethodRouter::new);
            by_path.insert(route.path, methods.on(route.filter, handler));
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| router.route(&path, methods))
            .fallback(route_not_found)
            .method_not_allowed_fallback(method_not_allowed)
    }
}

async fn route_not_found(uri: Uri) -> RouteNotFound {
    RouteNotFound::Path(uri.path().to_string())
}

async fn method_not_allowed(method: Method, uri: Uri) -> RouteNotFound {
    RouteNotFound::Method {
        method,
        path: uri.path().to_string(),
    }
}

/// The gateway's fixed route table.
pub fn gateway_routes() -> Result<RouteTable, RouteError> {
    let mut table = RouteTable::new();
    table.register(Method::POST, "/", Capability::Publish)?;
    table.register(Method::POST, "/log-grpc", Capability::LogRpc)?;
    table.register(Method::POST, "/handle", Capability::Inspect)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_table_binds_three_posts() {
        let table = gateway_routes().unwrap();
        assert_eq!(table.routes().len(), 3);
        assert_eq!(table.lookup(&Method::POST, "/"), Ok(Capability::Publish));
        assert_eq!(table.lookup(&Method::POST, "/log-grpc"), Ok(Capability::LogRpc));
        assert_eq!(table.lookup(&Method::POST, "/handle"), Ok(Capability::Inspect));
    }

    #[test]
    fn rejects_duplicates() {
        let mut table = gateway_routes().unwrap();
        let err = table.register(Method::POST, "/handle", Capability::Publish).unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::POST,
                path: "/handle".into()
            }
        );
        // Same path, other method is fine.
        assert!(table.register(Method::PUT, "/handle", Capability::Inspect).is_ok());
    }

    #[test]
    fn rejects_relative_paths() {
        let mut table = RouteTable::new();
        assert!(matches!(
            table.register(Method::POST, "handle", Capability::Inspect),
            Err(RouteError::InvalidPath(_))
        ));
    }

    #[test]
    fn lookup_distinguishes_missing_path_and_method() {
        let table = gateway_routes().unwrap();

        let miss = table.lookup(&Method::GET, "/nowhere").unwrap_err();
        assert_eq!(miss.status(), StatusCode::NOT_FOUND);

        let miss = table.lookup(&Method::GET, "/handle").unwrap_err();
        assert_eq!(miss.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
