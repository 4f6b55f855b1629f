use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};

use crate::access::{self, can_manage_book};
use crate::auth::{CurrentUser, MaybeAuth};
use crate::server::AppState;
use crate::server::dto::{BookDetailResponse, ChapterOverview, PaginationParams};
use crate::server::response::{ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, paginate};
use crate::types::{Book, BookStatus};

pub fn catalog_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/{id}", get(get_book))
        .route("/books/{id}/reviews", get(list_reviews))
}

/// Fetches a book as seen by `viewer`: published books are public, drafts
/// and archived books exist only for their author and admins.
pub(crate) fn visible_book(
    state: &AppState,
    viewer: Option<&CurrentUser>,
    book_id: &str,
) -> Result<Book, ApiError> {
    let book = state
        .store
        .get_book(book_id)?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;

    if book.status != BookStatus::Published {
        let manager = viewer.is_some_and(|u| can_manage_book(u.roles, u.id(), &book));
        if !manager {
            return Err(ApiError::not_found("Book not found"));
        }
    }

    Ok(book)
}

async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = params.cursor.unwrap_or_default();
    let books = state
        .store
        .list_published_books(&cursor, DEFAULT_PAGE_SIZE + 1)?;

    let (books, next_cursor, has_more) =
        paginate(books, DEFAULT_PAGE_SIZE as usize, |b| b.id.clone());

    Ok(Json(PaginatedResponse::new(books, next_cursor, has_more)))
}

async fn get_book(
    MaybeAuth(viewer): MaybeAuth,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let book = visible_book(&state, viewer.as_ref(), &book_id)?;

    let purchased = match viewer.as_ref() {
        Some(user) => state.store.has_purchase(user.id(), &book.id)?,
        None => false,
    };
    let manager = viewer
        .as_ref()
        .is_some_and(|u| can_manage_book(u.roles, u.id(), &book));

    let chapters = state
        .store
        .list_chapters(&book.id)?
        .into_iter()
        .map(|chapter| {
            let verdict =
                access::evaluate(&book, &chapter, purchased, viewer.is_some());
            ChapterOverview {
                id: chapter.id,
                chapter_number: chapter.chapter_number,
                title: chapter.title,
                is_free: chapter.is_free,
                locked: !manager && !verdict.is_allowed(),
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(BookDetailResponse {
        book,
        purchased,
        chapters,
    })))
}

async fn list_reviews(
    MaybeAuth(viewer): MaybeAuth,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let book = visible_book(&state, viewer.as_ref(), &book_id)?;
    let reviews = state.store.list_reviews(&book.id)?;
    Ok(Json(ApiResponse::success(reviews)))
}
