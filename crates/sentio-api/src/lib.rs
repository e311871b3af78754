//! HTTP surface of the emotional assistant.
//!
//! Exposes account registration and login, session welcome, chat turns and
//! a health check over axum.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
