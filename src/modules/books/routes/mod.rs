//! Book handlers. Each one maps a single route to a single store call,
//! apart from the ownership lookups on update and delete.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use bookshare_authz::VerifiedIdentity;
use bookshare_db::{
    DeleteOutcome, Document, DocumentId, FindQuery, InsertOutcome, Precondition, SortOrder,
    UpdateOutcome,
};
use bookshare_http::{ApiResult, AppError, Envelope};
use bookshare_kernel::AppState;
use serde_json::Value;

use super::models::{MyBooksQuery, CREATED_AT_FIELD, LATEST_BOOKS_LIMIT, OWNER_FIELD};

/// A stored book without an owner may be changed by any verified caller.
fn ensure_owner(book: &Document, identity: &VerifiedIdentity) -> Result<(), AppError> {
    match book.get(OWNER_FIELD) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(owner)) if identity.is(owner) => Ok(()),
        Some(_) => Err(AppError::forbidden("book belongs to another user")),
    }
}

/// The owner a write expects to still find on the stored book.
fn owner_precondition(book: &Document) -> Precondition {
    Precondition::new(OWNER_FIELD, book.get(OWNER_FIELD).cloned().unwrap_or(Value::Null))
}

/// A request body may only name the caller as owner. An accepted name is
/// stored in the verified spelling, which is what `/my-books` filters on.
fn claim_owner(body: &mut Document, identity: &VerifiedIdentity) -> Result<(), AppError> {
    match body.get(OWNER_FIELD) {
        None => return Ok(()),
        Some(Value::String(owner)) if identity.is(owner) => {}
        Some(_) => return Err(AppError::forbidden("userEmail must match the signed-in user")),
    }
    body.insert(OWNER_FIELD.to_string(), Value::String(identity.email.clone()));
    Ok(())
}

/// `GET /all-books`
pub async fn all_books(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    let books = state
        .store
        .find(state.books_collection(), FindQuery::all())
        .await?;
    Ok(Envelope::ok(books))
}

/// `GET /book-details/{id}`: `null` when nothing matches.
pub async fn book_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Option<Document>> {
    let id = DocumentId::parse(&id)?;
    let book = state.store.find_by_id(state.books_collection(), &id).await?;
    Ok(Envelope::ok(book))
}

/// `POST /add-book`: stores the body verbatim, stamping the owner if absent.
pub async fn add_book(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<InsertOutcome> {
    let Json(mut book) = payload?;
    claim_owner(&mut book, &identity)?;
    book.entry(OWNER_FIELD)
        .or_insert_with(|| Value::String(identity.email.clone()));

    let outcome = state
        .store
        .insert_one(state.books_collection(), book)
        .await?;

    tracing::info!(book_id = %outcome.inserted_id, "book added");
    Ok(Envelope::ok(outcome))
}

/// `PUT /update-book/{id}`: shallow merge of the body's fields.
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<VerifiedIdentity>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<UpdateOutcome> {
    let id = DocumentId::parse(&id)?;
    let Json(mut fields) = payload?;
    claim_owner(&mut fields, &identity)?;

    let precondition = match state.store.find_by_id(state.books_collection(), &id).await? {
        Some(existing) => {
            ensure_owner(&existing, &identity)?;
            Some(owner_precondition(&existing))
        }
        None => None,
    };

    let outcome = state
        .store
        .update_by_id(state.books_collection(), &id, precondition.as_ref(), fields)
        .await?;

    tracing::info!(
        book_id = %id,
        matched = outcome.matched_count,
        modified = outcome.modified_count,
        "book updated"
    );
    Ok(Envelope::ok(outcome))
}

/// `DELETE /books/{id}`: deleting a missing book reports zero and succeeds.
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(identity): Extension<VerifiedIdentity>,
) -> ApiResult<DeleteOutcome> {
    let id = DocumentId::parse(&id)?;

    let precondition = match state.store.find_by_id(state.books_collection(), &id).await? {
        Some(existing) => {
            ensure_owner(&existing, &identity)?;
            Some(owner_precondition(&existing))
        }
        None => None,
    };

    let outcome = state
        .store
        .delete_by_id(state.books_collection(), &id, precondition.as_ref())
        .await?;

    tracing::info!(book_id = %id, deleted = outcome.deleted_count, "book deleted");
    Ok(Envelope::ok(outcome))
}

/// `GET /my-books`: always the verified caller's books.
pub async fn my_books(
    State(state): State<AppState>,
    Extension(identity): Extension<VerifiedIdentity>,
    query: Result<Query<MyBooksQuery>, QueryRejection>,
) -> ApiResult<Vec<Document>> {
    let Query(query) = query?;
    if let Some(email) = query.email.as_deref() {
        if !identity.is(email) {
            return Err(AppError::forbidden("books of another user cannot be listed"));
        }
    }

    let books = state
        .store
        .find(
            state.books_collection(),
            FindQuery::all().filter_eq(OWNER_FIELD, identity.email.clone()),
        )
        .await?;
    Ok(Envelope::ok(books))
}

/// `GET /latest-books`
pub async fn latest_books(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    let books = state
        .store
        .find(
            state.books_collection(),
            FindQuery::all()
                .sort_by(CREATED_AT_FIELD, SortOrder::Descending)
                .limit(LATEST_BOOKS_LIMIT),
        )
        .await?;
    Ok(Envelope::ok(books))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(email: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            subject: "uid".to_string(),
            email: email.to_string(),
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn ownerless_books_are_open_to_verified_callers() {
        let reader = identity("reader@example.com");
        assert!(ensure_owner(&doc(json!({"title": "Dune"})), &reader).is_ok());
        assert!(ensure_owner(&doc(json!({"userEmail": null})), &reader).is_ok());
    }

    #[test]
    fn foreign_books_are_refused() {
        let reader = identity("reader@example.com");
        let book = doc(json!({"userEmail": "owner@example.com"}));
        let err = ensure_owner(&book, &reader).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn bodies_may_only_name_the_caller() {
        let reader = identity("reader@example.com");
        assert!(claim_owner(&mut doc(json!({"title": "Dune"})), &reader).is_ok());
        assert!(claim_owner(&mut doc(json!({"userEmail": null})), &reader).is_err());
        assert!(claim_owner(&mut doc(json!({"userEmail": "x@example.com"})), &reader).is_err());
    }

    #[test]
    fn claimed_owner_takes_the_verified_spelling() {
        let reader = identity("reader@example.com");
        let mut body = doc(json!({"userEmail": "READER@Example.com"}));
        claim_owner(&mut body, &reader).unwrap();
        assert_eq!(body["userEmail"], json!("reader@example.com"));
    }

    #[test]
    fn writes_expect_the_owner_they_checked() {
        let owned = owner_precondition(&doc(json!({"userEmail": "reader@example.com"})));
        assert_eq!(owned, Precondition::new(OWNER_FIELD, "reader@example.com"));

        let unowned = owner_precondition(&doc(json!({"title": "Dune"})));
        assert_eq!(unowned, Precondition::new(OWNER_FIELD, Value::Null));
    }
}
