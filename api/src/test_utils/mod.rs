//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! The in-memory repository covers happy paths and stateful flows; tests that
//! need to inject repository failures use a `mockall` mock of the port instead.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
