mod books;
mod chapters;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::access::can_manage_book;
use crate::auth::CurrentUser;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::Book;

pub fn writer_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", post(books::create_book))
        .route("/books/{id}", patch(books::update_book))
        .route("/me/books", get(books::my_books))
        .route("/books/{id}/chapters", post(chapters::create_chapter))
        .route(
            "/books/{id}/chapters/{number}",
            patch(chapters::update_chapter),
        )
        .route(
            "/books/{id}/chapters/{number}",
            delete(chapters::delete_chapter),
        )
}

/// Fetches the book and checks management rights in one step. A book the
/// caller may not manage is indistinguishable from a missing one.
fn managed_book(state: &AppState, user: &CurrentUser, book_id: &str) -> Result<Book, ApiError> {
    let book = state
        .store
        .get_book(book_id)?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;

    if !can_manage_book(user.roles, user.id(), &book) {
        return Err(ApiError::forbidden("You do not manage this book"));
    }

    Ok(book)
}
