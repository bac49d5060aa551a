pub mod models;
pub mod routes;

use bookshare_kernel::{Access, Module, RouteEntry};
use serde_json::json;

/// Book catalogue: listing, details, and owner-gated writes
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn routes(&self) -> Vec<RouteEntry> {
        vec![
            RouteEntry::get("/all-books", Access::Public, routes::all_books),
            RouteEntry::get("/book-details/{id}", Access::Public, routes::book_details),
            RouteEntry::get("/latest-books", Access::Public, routes::latest_books),
            RouteEntry::get("/my-books", Access::Authenticated, routes::my_books),
            RouteEntry::post("/add-book", Access::Authenticated, routes::add_book),
            RouteEntry::put("/update-book/{id}", Access::Authenticated, routes::update_book),
            RouteEntry::delete("/books/{id}", Access::Authenticated, routes::delete_book),
        ]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "pattern": "^[0-9a-fA-F]{24}$" }
        });
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let envelope = |description: &str, schema: serde_json::Value| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "properties": {
                                "success": { "type": "boolean" },
                                "result": schema
                            },
                            "required": ["success", "result"]
                        }
                    }
                }
            })
        };
        let book_list = json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } });
        let secured = json!([{ "bearerAuth": [] }]);

        Some(json!({
            "paths": {
                "/all-books": {
                    "get": {
                        "summary": "List every book",
                        "tags": ["Books"],
                        "responses": { "200": envelope("All books", book_list.clone()) }
                    }
                },
                "/book-details/{id}": {
                    "get": {
                        "summary": "Get one book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": envelope("The book, or null", json!({ "$ref": "#/components/schemas/Book" })),
                            "400": error("Malformed identifier")
                        }
                    }
                },
                "/latest-books": {
                    "get": {
                        "summary": "Six most recent books by createdAt",
                        "tags": ["Books"],
                        "responses": { "200": envelope("Latest books", book_list.clone()) }
                    }
                },
                "/my-books": {
                    "get": {
                        "summary": "Books owned by the signed-in user",
                        "tags": ["Books"],
                        "security": secured.clone(),
                        "parameters": [{
                            "name": "email",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": envelope("Caller's books", book_list),
                            "401": error("Missing or invalid token"),
                            "403": error("Email does not match the signed-in user")
                        }
                    }
                },
                "/add-book": {
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "security": secured.clone(),
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "responses": {
                            "200": envelope("Insert metadata", json!({ "$ref": "#/components/schemas/InsertOutcome" })),
                            "401": error("Missing or invalid token"),
                            "403": error("userEmail names another user")
                        }
                    }
                },
                "/update-book/{id}": {
                    "put": {
                        "summary": "Shallow-merge fields into a book",
                        "tags": ["Books"],
                        "security": secured.clone(),
                        "parameters": [id_param.clone()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "responses": {
                            "200": envelope("Update metadata", json!({ "$ref": "#/components/schemas/UpdateOutcome" })),
                            "400": error("Malformed identifier or body"),
                            "401": error("Missing or invalid token"),
                            "403": error("Book belongs to another user")
                        }
                    }
                },
                "/books/{id}": {
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": [id_param],
                        "responses": {
                            "200": envelope("Delete metadata", json!({ "$ref": "#/components/schemas/DeleteOutcome" })),
                            "400": error("Malformed identifier"),
                            "401": error("Missing or invalid token"),
                            "403": error("Book belongs to another user")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "description": "Schema-less; any extra fields are stored verbatim",
                        "properties": {
                            "_id": { "type": "string" },
                            "userEmail": { "type": "string", "format": "email" },
                            "createdAt": { "type": "string" }
                        },
                        "additionalProperties": true
                    },
                    "InsertOutcome": {
                        "type": "object",
                        "properties": {
                            "acknowledged": { "type": "boolean" },
                            "insertedId": { "type": "string" }
                        }
                    },
                    "UpdateOutcome": {
                        "type": "object",
                        "properties": {
                            "acknowledged": { "type": "boolean" },
                            "matchedCount": { "type": "integer" },
                            "modifiedCount": { "type": "integer" },
                            "upsertedCount": { "type": "integer" },
                            "upsertedId": { "type": ["string", "null"] }
                        }
                    },
                    "DeleteOutcome": {
                        "type": "object",
                        "properties": {
                            "acknowledged": { "type": "boolean" },
                            "deletedCount": { "type": "integer" }
                        }
                    }
                }
            }
        }))
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
