//! # StoryConnect
//!
//! The StoryConnect backend, usable both as a standalone binary and as a
//! library. Writers publish serialized books with a free-preview window,
//! readers purchase and read them, and a three-role capability model
//! (admin, writer, reader) guards every API surface.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use storyconnect::server::{AppState, create_router};
//! use storyconnect::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/storyconnect.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = AppState::new(Arc::new(store));
//! let router = create_router(Arc::new(state));
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the binary's CLI. Disable with `default-features = false`.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
