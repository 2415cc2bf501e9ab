//! # rolodex-core
//!
//! Core types, traits, and abstractions for the rolodex contact manager.
//!
//! This crate provides the domain models, repository trait definitions,
//! and the shared error type that the database and API crates depend on.

pub mod error;
pub mod models;
pub mod traits;
pub mod validate;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use validate::{require_non_blank, validate_contact_fields, validate_tag_name};

/// The reserved fallback group. Contact creates and updates that reference a
/// group id that does not exist resolve to this group instead.
pub const DEFAULT_GROUP_ID: i32 = 1;
