mod roles;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/roles", get(roles::list_user_roles))
        .route("/users/{id}/roles", post(roles::assign_role))
        .route("/users/{id}/roles/{role}", delete(roles::revoke_role))
}
