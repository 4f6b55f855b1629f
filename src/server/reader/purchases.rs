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
use crate::server::catalog::visible_book;
use crate::server::dto::RecordPurchaseRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{BookStatus, Purchase};

/// Records the outcome of an external checkout. Payment collection happens
/// entirely on the provider's side; this only persists the proof.
pub async fn record_purchase(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Json(req): Json<RecordPurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = visible_book(&state, Some(&user), &book_id)?;

    if book.status != BookStatus::Published {
        return Err(ApiError::bad_request("This book is not for sale"));
    }
    if req.amount_cents < 0 {
        return Err(ApiError::bad_request("Amount cannot be negative"));
    }
    if req.payment_method.trim().is_empty() {
        return Err(ApiError::bad_request("Payment method is required"));
    }

    let purchase = Purchase {
        id: Uuid::new_v4().to_string(),
        user_id: user.id().to_string(),
        book_id: book.id,
        amount_cents: req.amount_cents,
        payment_method: req.payment_method,
        transaction_id: req.transaction_id,
        purchased_at: Utc::now(),
    };

    // A second purchase of the same book is a 409, not a silent merge.
    state.store.create_purchase(&purchase)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(purchase))))
}

pub async fn my_purchases(
    RequireReader(user): RequireReader,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let purchases = state.store.list_purchases(user.id())?;
    Ok(Json(ApiResponse::success(purchases)))
}
