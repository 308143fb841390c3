//! Domain entities
//!
//! Pure domain models representing core business concepts.
//! These are separate from the SeaORM entities in the `entity` module.

pub mod user;

pub use user::{NewUser, Page, User, UserId, UserPage, UserUpdate};
