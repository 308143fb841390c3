//! Domain layer
//!
//! Business rules for users, independent of storage and transport.
//! - `entities`: Domain models and their validation
//! - `ports`: Trait definitions for persistence

pub mod entities;
pub mod ports;
