use thiserror::Error;

/// Reasons a token or provider configuration was rejected.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no bearer token presented")]
    MissingToken,

    #[error("token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token signed with unknown key")]
    UnknownKey,

    #[error("token carries no email claim")]
    MissingEmail,

    #[error("unknown token")]
    UnknownToken,

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(#[from] reqwest::Error),

    #[error("invalid service account credentials: {0}")]
    Credentials(String),
}
