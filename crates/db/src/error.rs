use thiserror::Error;

/// Failures surfaced by a [`crate::DocumentStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid identifier '{0}'")]
    InvalidId(String),

    #[error("document cannot be encoded: {0}")]
    Encoding(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
