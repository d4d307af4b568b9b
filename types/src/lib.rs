//! Shared types for the tvhub server.
//!
//! This crate contains the API types returned by the backend so that
//! clients can deserialize responses without depending on the server crate.

/// Default port for the tvhub backend server.
pub const DEFAULT_PORT: u16 = 7000;

pub mod version;

// Re-export commonly used types
pub use version::{Environment, VersionInformation};
