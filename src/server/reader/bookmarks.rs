use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::access::{self, can_manage_book};
use crate::auth::RequireReader;
use crate::server::AppState;
use crate::server::catalog::visible_book;
use crate::server::dto::CreateBookmarkRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Bookmark;

pub async fn create_bookmark(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Json(req): Json<CreateBookmarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = visible_book(&state, Some(&user), &book_id)?;

    let chapter = state
        .store
        .get_chapter(&req.chapter_id)?
        .ok_or_else(|| ApiError::not_found("Chapter not found"))?;
    if chapter.book_id != book.id {
        return Err(ApiError::not_found("Chapter not found"));
    }

    // Bookmarking follows the same gate as reading.
    let purchased = state.store.has_purchase(user.id(), &book.id)?;
    let manager = can_manage_book(user.roles, user.id(), &book);
    if !manager && !access::evaluate(&book, &chapter, purchased, true).is_allowed() {
        return Err(ApiError::forbidden("This chapter is locked"));
    }

    let bookmark = Bookmark {
        id: Uuid::new_v4().to_string(),
        user_id: user.id().to_string(),
        book_id: book.id,
        chapter_id: chapter.id,
        note: req.note,
        created_at: Utc::now(),
    };

    state.store.create_bookmark(&bookmark)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(bookmark))))
}

pub async fn list_bookmarks(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let book = visible_book(&state, Some(&user), &book_id)?;
    let bookmarks = state.store.list_bookmarks(user.id(), &book.id)?;
    Ok(Json(ApiResponse::success(bookmarks)))
}

pub async fn delete_bookmark(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
    Path((_book_id, chapter_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    // Removing an absent bookmark is a no-op success; the toggle UI
    // cannot tell the difference anyway.
    state.store.delete_bookmark(user.id(), &chapter_id)?;
    Ok(StatusCode::NO_CONTENT)
}
