use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use super::managed_book;
use crate::auth::RequireWriter;
use crate::server::AppState;
use crate::server::dto::{CreateChapterRequest, UpdateChapterRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation;
use crate::types::Chapter;

pub async fn create_chapter(
    RequireWriter(user): RequireWriter,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Json(req): Json<CreateChapterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = managed_book(&state, &user, &book_id)?;

    validation::validate_chapter_number(req.chapter_number)?;
    validation::validate_title(&req.title)?;

    let now = Utc::now();
    let chapter = Chapter {
        id: Uuid::new_v4().to_string(),
        book_id: book.id.clone(),
        chapter_number: req.chapter_number,
        title: req.title.trim().to_string(),
        content: req.content,
        is_free: req.is_free,
        created_at: now,
        updated_at: now,
    };

    state.store.create_chapter(&chapter)?;
    state.store.refresh_book_chapter_count(&book.id)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(chapter))))
}

fn chapter_by_number(state: &AppState, book_id: &str, number: i64) -> Result<Chapter, ApiError> {
    state
        .store
        .get_chapter_by_number(book_id, number)?
        .ok_or_else(|| ApiError::not_found("Chapter not found"))
}

pub async fn update_chapter(
    RequireWriter(user): RequireWriter,
    State(state): State<Arc<AppState>>,
    Path((book_id, number)): Path<(String, i64)>,
    Json(req): Json<UpdateChapterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = managed_book(&state, &user, &book_id)?;
    let mut chapter = chapter_by_number(&state, &book.id, number)?;

    if let Some(number) = req.chapter_number {
        validation::validate_chapter_number(number)?;
        chapter.chapter_number = number;
    }
    if let Some(title) = req.title {
        validation::validate_title(&title)?;
        chapter.title = title.trim().to_string();
    }
    if let Some(content) = req.content {
        chapter.content = content;
    }
    if let Some(is_free) = req.is_free {
        chapter.is_free = is_free;
    }

    state.store.update_chapter(&chapter)?;

    Ok(Json(ApiResponse::success(chapter)))
}

pub async fn delete_chapter(
    RequireWriter(user): RequireWriter,
    State(state): State<Arc<AppState>>,
    Path((book_id, number)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let book = managed_book(&state, &user, &book_id)?;
    let chapter = chapter_by_number(&state, &book.id, number)?;

    state.store.delete_chapter(&chapter.id)?;
    state.store.refresh_book_chapter_count(&book.id)?;

    Ok(StatusCode::NO_CONTENT)
}
