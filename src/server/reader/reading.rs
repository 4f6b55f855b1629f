use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::access::{self, ChapterAccess, can_manage_book};
use crate::auth::MaybeAuth;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::BookStatus;

/// The gated chapter endpoint. Anonymous readers get the free preview;
/// everything past it needs a purchase. Authors and admins bypass the gate
/// for their own catalog work.
pub async fn read_chapter(
    MaybeAuth(viewer): MaybeAuth,
    State(state): State<Arc<AppState>>,
    Path((book_id, chapter_number)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.as_ref().map(|u| u.id());
    let resolved =
        access::resolve_chapter(state.store.as_ref(), viewer_id, &book_id, chapter_number)?;

    let manager = viewer
        .as_ref()
        .is_some_and(|u| can_manage_book(u.roles, u.id(), &resolved.book));

    if resolved.book.status != BookStatus::Published && !manager {
        return Err(ApiError::not_found("Book not found"));
    }

    if manager {
        return Ok(Json(ApiResponse::success(resolved.chapter)));
    }

    match resolved.access {
        ChapterAccess::Allowed => Ok(Json(ApiResponse::success(resolved.chapter))),
        ChapterAccess::LockedNoAccount => Err(ApiError::unauthorized(
            "Sign in to continue reading beyond the free preview",
        )),
        ChapterAccess::LockedPreviewOnly => Err(ApiError::forbidden(
            "Purchase this book to continue reading",
        )),
    }
}
