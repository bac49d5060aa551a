//! Identity verification for bearer tokens.
//!
//! A verifier turns the token from `Authorization: Bearer <token>` into a
//! [`VerifiedIdentity`]. Failure reasons are kept internal; callers only learn
//! that verification failed.

use async_trait::async_trait;
use serde::Serialize;

pub mod error;
pub mod firebase;
pub mod static_tokens;

pub use error::AuthError;
pub use firebase::{FirebaseVerifier, ServiceAccount};
pub use static_tokens::StaticTokenVerifier;

/// Principal established from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
}

impl VerifiedIdentity {
    /// Case-insensitive comparison against an email address.
    pub fn is(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// Verifies a bearer token with an identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Provider name for logs.
    fn provider(&self) -> &'static str;

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Extract the token from an `Authorization` header value.
///
/// The value is split on whitespace: the first segment must be `Bearer`
/// (any case) and the second is the token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    parts.next()
}
