use thiserror::Error;

use crate::types::Role;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("user already has role '{0}'")]
    DuplicateRole(Role),

    #[error("book already purchased")]
    DuplicatePurchase,

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("role store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid session token format")]
    InvalidTokenFormat,

    #[error("session expired")]
    SessionExpired,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, Error>;
