use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use axum::Router;
use bookshare_authz::{FirebaseVerifier, IdentityVerifier, ServiceAccount, StaticTokenVerifier};
use bookshare_db::mongo::ConnectOptions;
use bookshare_db::{DocumentStore, MongoStore};
use bookshare_kernel::settings::{AuthProvider, AuthSettings, DatabaseSettings, Settings};
use bookshare_kernel::{AppState, ModuleRegistry};

use crate::modules;

/// Registry holding every route module.
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    registry
}

/// Full router for `state`, with the same middleware the server runs.
pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    bookshare_http::build_router(&registry(), state)
}

/// Pick the identity provider named by `auth.provider`.
pub fn build_verifier(auth: &AuthSettings) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    match auth.provider {
        AuthProvider::Static => {
            let verifier = StaticTokenVerifier::new(
                auth.static_tokens
                    .iter()
                    .map(|entry| (entry.token.clone(), entry.email.clone())),
            );
            if verifier.is_empty() {
                tracing::warn!("static auth provider has no tokens; every protected route will answer 401");
            }
            Ok(Arc::new(verifier))
        }
        AuthProvider::Firebase => {
            let project_id = match (&auth.project_id, &auth.service_account_path) {
                (Some(project_id), _) => project_id.clone(),
                (None, Some(path)) => {
                    ServiceAccount::from_file(Path::new(path))
                        .context("failed to read service account")?
                        .project_id
                }
                (None, None) => bail!(
                    "firebase auth needs auth.project_id or auth.service_account_path"
                ),
            };

            let verifier = FirebaseVerifier::new(
                project_id,
                auth.jwks_url.clone(),
                Duration::from_millis(auth.timeout_ms),
            )
            .context("failed to build firebase verifier")?;

            tracing::info!(project = verifier.project_id(), "firebase verifier ready");
            Ok(Arc::new(verifier))
        }
    }
}

/// Create the process-wide MongoDB handle.
pub async fn connect_store(database: &DatabaseSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = MongoStore::connect(ConnectOptions {
        uri: &database.uri,
        database: &database.name,
        user: database.user.as_deref(),
        password: database.password.as_deref(),
        app_name: env!("CARGO_PKG_NAME"),
    })
    .await
    .context("failed to create database client")?;

    Ok(Arc::new(store))
}

/// Connect, verify, and serve until shutdown.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let store = connect_store(&settings.database).await?;

    // An unreachable cluster is logged, not fatal; requests fail until it returns.
    match store.ping().await {
        Ok(()) => tracing::info!(backend = store.backend(), "database reachable"),
        Err(err) => tracing::error!(backend = store.backend(), error = %err, "database ping failed"),
    }

    let verifier = build_verifier(&settings.auth)?;
    let state = AppState::new(store, verifier, settings);

    bookshare_http::start_server(&registry(), state).await
}
