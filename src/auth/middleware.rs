use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use super::token::parse_session_token;
use crate::server::AppState;
use crate::types::{Profile, Role, RoleSet, Session};

/// The authenticated caller: session, profile, and the effective-queryable
/// role set the kernel settled on for this request.
pub struct CurrentUser {
    pub session: Session,
    pub profile: Profile,
    pub roles: RoleSet,
}

impl CurrentUser {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.profile.id
    }
}

/// Extractor that requires any valid session.
pub struct Auth(pub CurrentUser);

/// Extractor for endpoints that personalize but stay public: an absent
/// Authorization header yields anonymous, a bad one is still an error.
pub struct MaybeAuth(pub Option<CurrentUser>);

/// Extractors that additionally require a capability. The hierarchy rule
/// applies: an admin passes the writer guard, a writer passes the reader
/// guard.
pub struct RequireAdmin(pub CurrentUser);
pub struct RequireWriter(pub CurrentUser);
pub struct RequireReader(pub CurrentUser);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    SessionExpired,
    Denied(Role),
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AuthError::InvalidScheme => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization scheme".to_string(),
            ),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AuthError::SessionExpired => {
                (StatusCode::UNAUTHORIZED, "Session expired".to_string())
            }
            AuthError::Denied(role) => (
                StatusCode::FORBIDDEN,
                format!("This action requires the {role} role"),
            ),
            AuthError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"storyconnect\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        Ok(Auth(user))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            None => Ok(MaybeAuth(None)),
            Some(raw) => {
                let user = resolve_session(state, &raw).await?;
                Ok(MaybeAuth(Some(user)))
            }
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.roles.grants(Role::Admin) {
            return Err(AuthError::Denied(Role::Admin));
        }
        Ok(RequireAdmin(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireWriter {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.roles.grants(Role::Writer) {
            return Err(AuthError::Denied(Role::Writer));
        }
        Ok(RequireWriter(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireReader {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.roles.grants(Role::Reader) {
            return Err(AuthError::Denied(Role::Reader));
        }
        Ok(RequireReader(user))
    }
}

async fn authenticate(parts: &mut Parts, state: &Arc<AppState>) -> Result<CurrentUser, AuthError> {
    let raw = bearer_token(parts)?.ok_or(AuthError::MissingAuth)?;
    resolve_session(state, &raw).await
}

fn bearer_token(parts: &Parts) -> Result<Option<String>, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(token) => Ok(Some(token.to_string())),
            None => Err(AuthError::InvalidScheme),
        },
        None => Ok(None),
    }
}

/// Validates a raw session token and assembles the caller's identity.
/// The request blocks until the session's kernel settles, so a handler
/// never observes the loading window as a denial.
async fn resolve_session(state: &Arc<AppState>, raw: &str) -> Result<CurrentUser, AuthError> {
    let (lookup, _secret) = parse_session_token(raw).map_err(|_| AuthError::InvalidToken)?;

    let session = state
        .store
        .get_session_by_lookup(&lookup)
        .map_err(|_| AuthError::InternalError)?
        .ok_or(AuthError::InvalidToken)?;

    if !state
        .hasher
        .verify(raw, &session.token_hash)
        .map_err(|_| AuthError::InternalError)?
    {
        return Err(AuthError::InvalidToken);
    }

    if let Some(expires_at) = &session.expires_at {
        if expires_at < &Utc::now() {
            return Err(AuthError::SessionExpired);
        }
    }

    let profile = state
        .store
        .get_profile(&session.user_id)
        .map_err(|_| AuthError::InternalError)?
        .ok_or(AuthError::InvalidToken)?;

    if let Err(e) = state.store.update_session_last_used(&session.id) {
        tracing::warn!("Failed to update session last_used_at: {e}");
    }

    let kernel = state.authz.kernel_for(&session.id, &profile.id).await;
    let roles = kernel.wait_ready().await;

    Ok(CurrentUser {
        session,
        profile,
        roles,
    })
}
