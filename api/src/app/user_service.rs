//! User service
//!
//! The `UserService` capability and its repository-backed implementation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entities::{NewUser, Page, User, UserId, UserPage, UserUpdate};
use crate::domain::ports::UserRepository;
use crate::error::DomainError;

/// User management capability shared by every request handler
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create a user. Fails with `AlreadyExists` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;

    /// Fetch a user by ID
    async fn get(&self, id: UserId) -> Result<User, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// List users ordered by ID
    async fn list(&self, page: Page) -> Result<UserPage, DomainError>;

    /// Apply a partial update
    async fn update(&self, id: UserId, update: UserUpdate) -> Result<User, DomainError>;

    async fn delete(&self, id: UserId) -> Result<(), DomainError>;
}

/// `UserService` backed by a `UserRepository`
pub struct RepositoryUserService<UR>
where
    UR: UserRepository,
{
    users: Arc<UR>,
}

impl<UR> RepositoryUserService<UR>
where
    UR: UserRepository,
{
    pub fn new(users: Arc<UR>) -> Self {
        Self { users }
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<UserId>) -> Result<(), DomainError> {
        match self.users.find_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => Err(DomainError::AlreadyExists(
                format!("User with email '{}' already exists", email),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<UR> UserService for RepositoryUserService<UR>
where
    UR: UserRepository + 'static,
{
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let user = user.validated()?;
        self.ensure_email_free(&user.email, None).await?;

        let created = self.users.insert(&user).await?;
        tracing::info!(user_id = %created.id, "User created");
        Ok(created)
    }

    async fn get(&self, id: UserId) -> Result<User, DomainError> {
        self.users
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", id)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.users.find_by_email(&email.trim().to_lowercase()).await
    }

    async fn list(&self, page: Page) -> Result<UserPage, DomainError> {
        let items = self.users.list(page.limit, page.offset).await?;
        let total = self.users.count().await?;

        Ok(UserPage {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn update(&self, id: UserId, update: UserUpdate) -> Result<User, DomainError> {
        let update = update.validated()?;
        if let Some(ref email) = update.email {
            self.ensure_email_free(email, Some(id)).await?;
        }

        let updated = self
            .users
            .update(&id, &update)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User {} not found", id)))?;
        tracing::debug!(user_id = %id, "User updated");
        Ok(updated)
    }

    async fn delete(&self, id: UserId) -> Result<(), DomainError> {
        if !self.users.delete(&id).await? {
            return Err(DomainError::NotFound(format!("User {} not found", id)));
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
