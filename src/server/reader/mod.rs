mod bookmarks;
mod progress;
mod purchases;
mod reading;
mod reviews;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

pub fn reader_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books/{id}/chapters/{number}", get(reading::read_chapter))
        .route("/books/{id}/purchases", post(purchases::record_purchase))
        .route("/me/purchases", get(purchases::my_purchases))
        .route("/books/{id}/progress", put(progress::upsert_progress))
        .route("/me/progress", get(progress::my_progress))
        .route("/books/{id}/bookmarks", post(bookmarks::create_bookmark))
        .route("/books/{id}/bookmarks", get(bookmarks::list_bookmarks))
        .route(
            "/books/{id}/bookmarks/{chapter_id}",
            delete(bookmarks::delete_bookmark),
        )
        .route("/books/{id}/reviews", post(reviews::create_review))
}
