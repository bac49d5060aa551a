//! Firebase ID token verification.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::{AuthError, IdentityVerifier, VerifiedIdentity};

/// Public signing keys for Firebase ID tokens, as a JSON Web Key Set.
pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// The part of a service-account key file the verifier needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
}

impl ServiceAccount {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| AuthError::Credentials(format!("{}: {err}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|err| AuthError::Credentials(format!("{}: {err}", path.display())))
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies RS256 ID tokens issued for one Firebase project.
///
/// Signing keys are fetched from the provider on every verification.
#[derive(Debug, Clone)]
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    http: reqwest::Client,
}

impl FirebaseVerifier {
    pub fn new(
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            http,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("{ISSUER_PREFIX}{}", self.project_id)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let keys = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(keys)
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    fn provider(&self) -> &'static str {
        "firebase"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        // Structural checks come first so garbage never costs a key fetch.
        let header = jsonwebtoken::decode_header(token)?;
        let Some(kid) = header.kid else {
            tracing::debug!(target: "bookshare-authz", "token header carries no key id");
            return Err(AuthError::UnknownKey);
        };

        let keys = self.fetch_keys().await.inspect_err(|err| {
            tracing::debug!(target: "bookshare-authz", error = %err, "signing key fetch failed");
        })?;
        let Some(jwk) = keys.find(&kid) else {
            tracing::debug!(
                target: "bookshare-authz",
                kid = %kid,
                published = keys.keys.len(),
                "no published key matches the token"
            );
            return Err(AuthError::UnknownKey);
        };
        let key = DecodingKey::from_jwk(jwk)?;

        let data = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &self.validation())
            .inspect_err(|err| {
                tracing::debug!(target: "bookshare-authz", reason = ?err.kind(), "token failed validation");
            })?;
        let Some(email) = data.claims.email.filter(|email| !email.is_empty()) else {
            tracing::debug!(target: "bookshare-authz", "verified token has no email");
            return Err(AuthError::MissingEmail);
        };

        tracing::debug!(target: "bookshare-authz", project = %self.project_id, "token verified");
        Ok(VerifiedIdentity {
            subject: data.claims.sub,
            email,
        })
    }
}
