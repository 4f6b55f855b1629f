use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{Auth, issue_session_token};
use crate::server::AppState;
use crate::server::dto::{MeResponse, SessionResponse, SigninRequest, SignupRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation;
use crate::types::{Profile, Role, Session};

const SESSION_TTL_DAYS: i64 = 30;

pub fn accounts_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/signout", post(signout))
        .route("/me", get(me))
}

fn new_session(state: &AppState, user_id: &str) -> Result<(String, Session), ApiError> {
    let issued = issue_session_token(&state.hasher)?;
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        token_hash: issued.hash,
        token_lookup: issued.lookup,
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: Some(now + Duration::days(SESSION_TTL_DAYS)),
        last_used_at: None,
    };
    Ok((issued.raw, session))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_email(&req.email)?;
    validation::validate_password(&req.password)?;
    validation::validate_display_name(&req.display_name)?;

    // Admin is bootstrapped by `admin init` or granted by an existing
    // admin, never self-registered.
    if req.role == Role::Admin {
        return Err(ApiError::bad_request(
            "Admin accounts cannot be self-registered",
        ));
    }

    if state.store.get_profile_by_email(&req.email)?.is_some() {
        return Err(ApiError::conflict(
            "An account with this email already exists",
        ));
    }

    let now = Utc::now();
    let profile = Profile {
        id: Uuid::new_v4().to_string(),
        email: req.email,
        display_name: req.display_name.trim().to_string(),
        bio: None,
        password_hash: state.hasher.hash(&req.password)?,
        created_at: now,
        updated_at: now,
    };

    state.store.create_profile(&profile)?;
    state.store.assign_role(&profile.id, req.role)?;

    let (token, session) = new_session(&state, &profile.id)?;
    state.store.create_session(&session)?;

    let kernel = state.authz.begin_session(&session.id, &profile.id).await;
    let roles = kernel.wait_ready().await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SessionResponse {
            token,
            user: profile,
            roles: roles.to_vec(),
        })),
    ))
}

async fn signin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .store
        .get_profile_by_email(&req.email)?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !state
        .hasher
        .verify(&req.password, &profile.password_hash)?
    {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let (token, session) = new_session(&state, &profile.id)?;
    state.store.create_session(&session)?;

    // Every sign-in reloads roles from the source of truth.
    let kernel = state.authz.begin_session(&session.id, &profile.id).await;
    let roles = kernel.wait_ready().await;

    Ok(Json(ApiResponse::success(SessionResponse {
        token,
        user: profile,
        roles: roles.to_vec(),
    })))
}

async fn signout(
    Auth(user): Auth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.delete_session(&user.session.id)?;
    state.authz.end_session(&user.session.id);
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    Auth(user): Auth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state.store.list_roles(user.id())?;

    Ok(Json(ApiResponse::success(MeResponse {
        roles: stored,
        effective_roles: user.roles.effective().to_vec(),
        user: user.profile,
    })))
}
