use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::accounts::accounts_router;
use super::admin::admin_router;
use super::catalog::catalog_router;
use super::reader::reader_router;
use super::writer::writer_router;
use crate::auth::{AuthRegistry, DEFAULT_LOAD_TIMEOUT, SecretHasher, StoreRoleSource};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub authz: AuthRegistry,
    pub hasher: SecretHasher,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        let source = Arc::new(StoreRoleSource::new(Arc::clone(&store)));
        Self {
            store,
            authz: AuthRegistry::new(source, DEFAULT_LOAD_TIMEOUT),
            hasher: SecretHasher::new(),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", accounts_router())
        .nest("/api/v1", catalog_router())
        .nest("/api/v1", writer_router())
        .nest("/api/v1", reader_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
