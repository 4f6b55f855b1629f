use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{AdminUserResponse, PaginationParams};
use crate::server::response::{ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, paginate};

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = params.cursor.unwrap_or_default();
    let profiles = state
        .store
        .list_profiles(&cursor, DEFAULT_PAGE_SIZE + 1)?;

    let (profiles, next_cursor, has_more) =
        paginate(profiles, DEFAULT_PAGE_SIZE as usize, |p| p.id.clone());

    let mut users = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let roles = state.store.list_roles(&profile.id)?;
        users.push(AdminUserResponse {
            user: profile,
            roles,
        });
    }

    Ok(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .store
        .get_profile(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let roles = state.store.list_roles(&profile.id)?;

    Ok(Json(ApiResponse::success(AdminUserResponse {
        user: profile,
        roles,
    })))
}
