use bookshare_kernel::{Access, Module, RouteEntry};
use serde_json::json;

pub const HEALTH_MESSAGE: &str = "Server is running good";

/// Plain-text liveness message at the root path
pub struct HealthModule;

impl Module for HealthModule {
    fn name(&self) -> &'static str {
        "health"
    }

    fn routes(&self) -> Vec<RouteEntry> {
        vec![RouteEntry::get("/", Access::Public, health_check)]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Health check",
                        "tags": ["Health"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": {
                                    "text/plain": {
                                        "schema": { "type": "string" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    HEALTH_MESSAGE
}

pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(HealthModule)
}
