//! Mock implementations of port traits
//!
//! These are in-memory implementations that can be configured for testing.
//! They store data in memory and allow tests to verify behavior.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::app::{RepositoryUserService, UserService};
use crate::domain::entities::{NewUser, User, UserId, UserUpdate};
use crate::domain::ports::UserRepository;
use crate::error::DomainError;

// ============================================================================
// In-Memory User Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<BTreeMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a user for testing
    pub fn with_user(self, user: User) -> Self {
        self.users.write().unwrap().insert(user.id, user);
        self
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let users = self.users.read().unwrap();
        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let users = self.users.read().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, limit: u64, offset: u64) -> Result<Vec<User>, DomainError> {
        let users = self.users.read().unwrap();
        Ok(users
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.users.read().unwrap().len() as u64)
    }

    async fn insert(&self, new_user: &NewUser) -> Result<User, DomainError> {
        let mut users = self.users.write().unwrap();

        if users.values().any(|u| u.email == new_user.email) {
            return Err(DomainError::AlreadyExists(new_user.email.clone()));
        }

        let id = UserId(users.keys().next_back().map_or(1, |last| last.0 + 1));
        let now = Utc::now();
        let user = User {
            id,
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            age: new_user.age,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());

        Ok(user)
    }

    async fn update(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<Option<User>, DomainError> {
        let mut users = self.users.write().unwrap();
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };

        if let Some(ref name) = update.name {
            user.name = name.clone();
        }
        if let Some(ref email) = update.email {
            user.email = email.clone();
        }
        if let Some(age) = update.age {
            user.age = age;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: &UserId) -> Result<bool, DomainError> {
        Ok(self.users.write().unwrap().remove(id).is_some())
    }
}

/// A ready-to-register `UserService` over an empty in-memory repository
pub fn in_memory_user_service() -> Arc<dyn UserService> {
    Arc::new(RepositoryUserService::new(Arc::new(
        InMemoryUserRepository::new(),
    )))
}
