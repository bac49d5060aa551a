//! Process-wide state shared by every request.

use std::sync::Arc;

use bookshare_authz::IdentityVerifier;
use bookshare_db::DocumentStore;

use crate::settings::Settings;

/// Created once at startup; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        verifier: Arc<dyn IdentityVerifier>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            verifier,
            settings: Arc::new(settings),
        }
    }

    pub fn books_collection(&self) -> &str {
        &self.settings.database.books_collection
    }

    pub fn comments_collection(&self) -> &str {
        &self.settings.database.comments_collection
    }
}
