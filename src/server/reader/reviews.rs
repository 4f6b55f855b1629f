use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireReader;
use crate::server::AppState;
use crate::server::dto::CreateReviewRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation;
use crate::types::{BookStatus, Review};

pub async fn create_review(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state
        .store
        .get_book(&book_id)?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;
    if book.status != BookStatus::Published {
        return Err(ApiError::not_found("Book not found"));
    }

    validation::validate_rating(req.rating)?;

    let review = Review {
        id: Uuid::new_v4().to_string(),
        user_id: user.id().to_string(),
        book_id: book.id,
        rating: req.rating,
        comment: req.comment,
        created_at: Utc::now(),
    };

    state.store.create_review(&review)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(review))))
}
