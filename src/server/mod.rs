mod accounts;
mod admin;
mod catalog;
pub mod dto;
mod reader;
pub mod response;
mod router;
pub mod validation;
mod writer;

pub use router::{AppState, create_router};
