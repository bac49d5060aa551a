use std::fmt;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{self, MethodRouter};
use serde::Serialize;

use crate::state::AppState;

/// Whether a route needs a verified identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    Authenticated,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => f.write_str("public"),
            Access::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// One row of the routing table: method, path, access class and handler.
pub struct RouteEntry {
    pub method: Method,
    pub path: &'static str,
    pub access: Access,
    pub handler: MethodRouter<AppState>,
}

impl RouteEntry {
    pub fn get<H, T>(path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::GET,
            path,
            access,
            handler: routing::get(handler),
        }
    }

    pub fn post<H, T>(path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::POST,
            path,
            access,
            handler: routing::post(handler),
        }
    }

    pub fn put<H, T>(path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::PUT,
            path,
            access,
            handler: routing::put(handler),
        }
    }

    pub fn delete<H, T>(path: &'static str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::DELETE,
            path,
            access,
            handler: routing::delete(handler),
        }
    }

    pub fn summary(&self, module: &'static str) -> RouteSummary {
        RouteSummary {
            module,
            method: self.method.to_string(),
            path: self.path,
            access: self.access,
        }
    }
}

/// Handler-free view of a [`RouteEntry`], for listings and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub module: &'static str,
    pub method: String,
    pub path: &'static str,
    pub access: Access,
}

/// A group of routes mounted at the server root.
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Routing table rows contributed by this module
    fn routes(&self) -> Vec<RouteEntry>;

    /// OpenAPI fragment (`paths` and `components.schemas`) merged into the
    /// served document
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }
}
