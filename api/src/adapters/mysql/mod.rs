//! MySQL adapters
//!
//! Implementations of repository traits using SeaORM and MySQL.

pub mod schema;
pub mod user_repo;


pub use schema::ensure_schema;
pub use user_repo::MySqlUserRepository;
