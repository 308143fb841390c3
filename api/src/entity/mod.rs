//! SeaORM entities
//!
//! Table mappings used by the MySQL adapters.

pub mod users;
