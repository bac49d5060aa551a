use serde::Deserialize;

/// Owner of a book, compared against the verified email.
pub const OWNER_FIELD: &str = "userEmail";

/// Timestamp `/latest-books` orders by; the same name comments use.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Size of the `/latest-books` window.
pub const LATEST_BOOKS_LIMIT: i64 = 6;

/// Query string of `GET /my-books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MyBooksQuery {
    /// Optional; when present it must name the caller.
    #[serde(default)]
    pub email: Option<String>,
}
