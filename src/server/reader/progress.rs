use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireReader;
use crate::server::AppState;
use crate::server::catalog::visible_book;
use crate::server::dto::UpsertProgressRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation;
use crate::types::ReadingProgress;

pub async fn upsert_progress(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Json(req): Json<UpsertProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = visible_book(&state, Some(&user), &book_id)?;

    validation::validate_progress_percentage(req.progress_percentage)?;

    let chapter = state
        .store
        .get_chapter(&req.chapter_id)?
        .ok_or_else(|| ApiError::not_found("Chapter not found"))?;
    if chapter.book_id != book.id {
        return Err(ApiError::not_found("Chapter not found"));
    }

    let progress = ReadingProgress {
        user_id: user.id().to_string(),
        book_id: book.id,
        chapter_id: chapter.id,
        progress_percentage: req.progress_percentage,
        last_read_at: Utc::now(),
    };

    state.store.upsert_progress(&progress)?;

    Ok(Json(ApiResponse::success(progress)))
}

pub async fn my_progress(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state.store.list_progress(user.id())?;
    Ok(Json(ApiResponse::success(progress)))
}
