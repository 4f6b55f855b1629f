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
use crate::server::dto::{CreateBookRequest, UpdateBookRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation;
use crate::types::{Book, BookStatus};

pub async fn create_book(
    RequireWriter(user): RequireWriter,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_title(&req.title)?;
    validation::validate_price_cents(req.price_cents)?;
    validation::validate_free_chapters(req.free_chapters)?;

    let now = Utc::now();
    let book = Book {
        id: Uuid::new_v4().to_string(),
        author_id: user.id().to_string(),
        title: req.title.trim().to_string(),
        description: req.description,
        genre: req.genre,
        cover_url: req.cover_url,
        status: BookStatus::Draft,
        price_cents: req.price_cents,
        free_chapters: req.free_chapters,
        total_chapters: 0,
        published_at: None,
        created_at: now,
        updated_at: now,
    };

    state.store.create_book(&book)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(book))))
}

pub async fn update_book(
    RequireWriter(user): RequireWriter,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut book = managed_book(&state, &user, &book_id)?;

    if let Some(title) = req.title {
        validation::validate_title(&title)?;
        book.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        book.description = Some(description);
    }
    if let Some(genre) = req.genre {
        book.genre = Some(genre);
    }
    if let Some(cover_url) = req.cover_url {
        book.cover_url = Some(cover_url);
    }
    if let Some(price_cents) = req.price_cents {
        validation::validate_price_cents(price_cents)?;
        book.price_cents = price_cents;
    }
    if let Some(free_chapters) = req.free_chapters {
        validation::validate_free_chapters(free_chapters)?;
        book.free_chapters = free_chapters;
    }
    if let Some(status) = req.status {
        if status == BookStatus::Published && book.published_at.is_none() {
            book.published_at = Some(Utc::now());
        }
        book.status = status;
    }

    // A published book cannot promise more free chapters than it has.
    if book.status == BookStatus::Published && book.free_chapters > book.total_chapters {
        return Err(ApiError::bad_request(
            "Free chapter count cannot exceed the number of chapters",
        ));
    }

    state.store.update_book(&book)?;

    Ok(Json(ApiResponse::success(book)))
}

pub async fn my_books(
    RequireWriter(user): RequireWriter,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let books = state.store.list_author_books(user.id())?;
    Ok(Json(ApiResponse::success(books)))
}
