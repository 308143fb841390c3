//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod health;
pub mod users;

pub use health::health;
pub use users::{create_user, delete_user, get_user, list_users, update_user};
