//! Fixed token table for local development and tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{AuthError, IdentityVerifier, VerifiedIdentity};

/// Maps opaque tokens straight to email addresses.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new<I, T, E>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (T, E)>,
        T: Into<String>,
        E: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(token, email)| (token.into(), email.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    fn provider(&self) -> &'static str {
        "static"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let email = self.tokens.get(token).ok_or(AuthError::UnknownToken)?;
        Ok(VerifiedIdentity {
            subject: format!("static:{email}"),
            email: email.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_tokens_resolve_to_their_email() {
        let verifier = StaticTokenVerifier::new([("t-1", "reader@example.com")]);
        let identity = verifier.verify("t-1").await.unwrap();
        assert_eq!(identity.email, "reader@example.com");
    }

    #[tokio::test]
    async fn unknown_tokens_are_rejected() {
        let verifier = StaticTokenVerifier::new([("t-1", "reader@example.com")]);
        assert!(matches!(
            verifier.verify("t-2").await,
            Err(AuthError::UnknownToken)
        ));
        assert!(matches!(
            verifier.verify("").await,
            Err(AuthError::MissingToken)
        ));
    }
}
