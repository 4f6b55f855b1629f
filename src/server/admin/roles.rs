use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::AssignRoleRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{Profile, Role};

fn lookup_user(state: &AppState, user_id: &str) -> Result<Profile, ApiError> {
    state
        .store
        .get_profile(user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn list_user_roles(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = lookup_user(&state, &user_id)?;
    let roles = state.store.list_roles(&user.id)?;
    Ok(Json(ApiResponse::success(roles)))
}

pub async fn assign_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = lookup_user(&state, &user_id)?;

    // A duplicate grant surfaces as 409 so the caller can tell "already
    // had it" from "just granted".
    state.store.assign_role(&user.id, req.role)?;

    // Live sessions re-load so the grant takes effect immediately.
    state.authz.roles_changed(&user.id).await;

    let roles = state.store.list_roles(&user.id)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(roles))))
}

pub async fn revoke_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((user_id, role)): Path<(String, Role)>,
) -> Result<impl IntoResponse, ApiError> {
    let user = lookup_user(&state, &user_id)?;

    // Revoking a role the user does not hold is a no-op success.
    state.store.revoke_role(&user.id, role)?;

    state.authz.roles_changed(&user.id).await;

    Ok(StatusCode::NO_CONTENT)
}
