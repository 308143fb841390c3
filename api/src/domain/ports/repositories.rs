//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., MySQL).

use async_trait::async_trait;

use crate::domain::entities::{NewUser, User, UserId, UserUpdate};
use crate::error::DomainError;

/// Repository for User entities
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Find a user by (normalized) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// List users ordered by ID
    async fn list(&self, limit: u64, offset: u64) -> Result<Vec<User>, DomainError>;

    /// Total number of users
    async fn count(&self) -> Result<u64, DomainError>;

    /// Insert a new user
    async fn insert(&self, user: &NewUser) -> Result<User, DomainError>;

    /// Apply a partial update, returning the updated row if it exists
    async fn update(&self, id: &UserId, update: &UserUpdate)
        -> Result<Option<User>, DomainError>;

    /// Delete a user, returning whether a row was removed
    async fn delete(&self, id: &UserId) -> Result<bool, DomainError>;
}
