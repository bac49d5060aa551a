//! HTTP server facade for bookshare with Axum, uniform envelopes, and OpenAPI support.

use anyhow::Context;
use axum::Router;

use bookshare_kernel::{AppState, ModuleRegistry};

pub mod auth;
pub mod envelope;
pub mod error;
pub mod router;

pub use envelope::{ApiResult, Envelope};
pub use error::AppError;
use router::RouterBuilder;

/// Start the HTTP server and serve until a shutdown signal arrives
pub async fn start_server(registry: &ModuleRegistry, state: AppState) -> anyhow::Result<()> {
    let host = state.settings.server.host.clone();
    let port = state.settings.server.port;

    tracing::info!("starting HTTP server on {}:{}", host, port);

    let app = build_router(registry, state).context("failed to build HTTP router")?;

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .context("failed to bind to address")?;

    tracing::info!("HTTP server listening on http://{}:{}", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with every module's routing table mounted
pub fn build_router(registry: &ModuleRegistry, state: AppState) -> anyhow::Result<Router> {
    registry.validate()?;

    let mut router_builder = RouterBuilder::new();
    for module in registry.modules() {
        router_builder = router_builder.mount_module(module.as_ref(), &state);
    }

    // Layers wrap the routes added above, so they come last.
    let router = router_builder
        .with_openapi(registry)
        .with_method_not_allowed()
        .with_fallback()
        .with_timeout(state.settings.server.request_timeout_ms)
        .with_cors()
        .with_tracing()
        .with_request_id()
        .build(state);

    Ok(router)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
