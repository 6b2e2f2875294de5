//! Shared fixtures for integration tests.

pub mod fixtures;
pub mod localstack;

pub use fixtures::{LocalFleet, at};
pub use localstack::LocalStackTestContext;
