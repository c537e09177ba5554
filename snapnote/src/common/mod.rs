//! Common utilities shared across the store, router and configuration layers

/// Environment variable loading utilities
pub mod env_loader;

/// Monotonic id generation
pub mod ulid_generator;

pub use env_loader::{load_env_optional, load_env_parsed, EnvLoader};
pub use ulid_generator::{generate_monotonic_ulid, generate_monotonic_ulid_string};
