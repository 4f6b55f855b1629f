use serde::{Deserialize, Serialize};

use crate::types::{Book, BookStatus, Profile, Role};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// Starting role chosen at registration; admin is rejected.
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: Profile,
    pub roles: Vec<Role>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: Profile,
    /// Roles as stored.
    pub roles: Vec<Role>,
    /// Roles after the hierarchy rule is applied.
    pub effective_roles: Vec<Role>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    #[serde(flatten)]
    pub user: Profile,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub free_chapters: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub free_chapters: Option<i64>,
    #[serde(default)]
    pub status: Option<BookStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChapterRequest {
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_free: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateChapterRequest {
    #[serde(default)]
    pub chapter_number: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_free: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPurchaseRequest {
    pub amount_cents: i64,
    pub payment_method: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertProgressRequest {
    pub chapter_id: String,
    pub progress_percentage: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookmarkRequest {
    pub chapter_id: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// One row of a book's table of contents, with the gate's verdict for the
/// current viewer but without the body text.
#[derive(Debug, Serialize)]
pub struct ChapterOverview {
    pub id: String,
    pub chapter_number: i64,
    pub title: String,
    pub is_free: bool,
    pub locked: bool,
}

#[derive(Debug, Serialize)]
pub struct BookDetailResponse {
    #[serde(flatten)]
    pub book: Book,
    pub purchased: bool,
    pub chapters: Vec<ChapterOverview>,
}
