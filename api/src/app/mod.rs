//! Application layer
//!
//! Contains use cases and service orchestration.
//! Services coordinate between domain entities and ports.

pub mod user_service;

pub use user_service::{RepositoryUserService, UserService};
