//! User domain entity
//!
//! Represents an account stored in the `users` table.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub const MAX_NAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_AGE: i32 = 150;

/// Unique identifier for a user (auto-increment primary key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a new user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<i32>,
}

impl NewUser {
    /// Validate and normalize (trimmed name, lower-cased email)
    pub fn validated(self) -> Result<Self, DomainError> {
        Ok(Self {
            name: validate_name(&self.name)?,
            email: validate_email(&self.email)?,
            age: validate_age(self.age)?,
        })
    }
}

/// Partial update of a user.
///
/// `age: Some(None)` clears the stored age.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub age: Option<Option<i32>>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }

    pub fn validated(self) -> Result<Self, DomainError> {
        if self.is_empty() {
            return Err(DomainError::Validation(
                "At least one of name, email or age must be provided".to_string(),
            ));
        }

        Ok(Self {
            name: self.name.as_deref().map(validate_name).transpose()?,
            email: self.email.as_deref().map(validate_email).transpose()?,
            age: self.age.map(validate_age).transpose()?,
        })
    }
}

/// Distinguishes an absent field from an explicit `null`
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

/// Pagination window for listing users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Result<Self, DomainError> {
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(DomainError::Validation(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }

        Ok(Self {
            limit,
            offset: offset.unwrap_or(0),
        })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of users plus the total row count
#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub items: Vec<User>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

pub fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::Validation(format!(
            "Name must be between 1 and {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

pub fn validate_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if email.len() > MAX_EMAIL_LEN || !email_regex().is_match(&email) {
        return Err(DomainError::Validation(format!(
            "Invalid email address: {}",
            email
        )));
    }
    Ok(email)
}

pub fn validate_age(age: Option<i32>) -> Result<Option<i32>, DomainError> {
    match age {
        Some(a) if !(0..=MAX_AGE).contains(&a) => Err(DomainError::Validation(format!(
            "Age must be between 0 and {}",
            MAX_AGE
        ))),
        other => Ok(other),
    }
}
