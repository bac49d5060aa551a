//! Comments on books. Both routes are public; comments are never edited.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use bookshare_db::{Document, FindQuery, InsertOutcome, SortOrder};
use bookshare_http::{ApiResult, Envelope};
use bookshare_kernel::{Access, AppState, Module, RouteEntry};
use serde_json::json;

/// Reference from a comment to its book. Not checked against `books`.
pub const BOOK_ID_FIELD: &str = "bookId";

pub const CREATED_AT_FIELD: &str = "createdAt";

pub struct CommentsModule;

impl CommentsModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Module for CommentsModule {
    fn name(&self) -> &'static str {
        "comments"
    }

    fn routes(&self) -> Vec<RouteEntry> {
        vec![
            RouteEntry::post("/comments", Access::Public, post_comment),
            RouteEntry::get("/comments/{bookId}", Access::Public, list_comments),
        ]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/comments": {
                    "post": {
                        "summary": "Post a comment",
                        "tags": ["Comments"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Comment" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Enveloped insert metadata" },
                            "400": {
                                "description": "Malformed body",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/comments/{bookId}": {
                    "get": {
                        "summary": "Comments on a book, newest first",
                        "tags": ["Comments"],
                        "parameters": [{
                            "name": "bookId",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": { "description": "Enveloped array of comments, possibly empty" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Comment": {
                        "type": "object",
                        "properties": {
                            "_id": { "type": "string" },
                            "bookId": { "type": "string" },
                            "createdAt": { "type": "string" }
                        },
                        "additionalProperties": true
                    }
                }
            }
        }))
    }
}

/// `POST /comments`
async fn post_comment(
    State(state): State<AppState>,
    payload: Result<Json<Document>, JsonRejection>,
) -> ApiResult<InsertOutcome> {
    let Json(comment) = payload?;
    let outcome = state
        .store
        .insert_one(state.comments_collection(), comment)
        .await?;

    tracing::info!(comment_id = %outcome.inserted_id, "comment posted");
    Ok(Envelope::ok(outcome))
}

/// `GET /comments/{bookId}`
async fn list_comments(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> ApiResult<Vec<Document>> {
    let comments = state
        .store
        .find(
            state.comments_collection(),
            FindQuery::all()
                .filter_eq(BOOK_ID_FIELD, book_id)
                .sort_by(CREATED_AT_FIELD, SortOrder::Descending),
        )
        .await?;
    Ok(Envelope::ok(comments))
}

/// Create a new instance of the comments module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CommentsModule::new())
}
