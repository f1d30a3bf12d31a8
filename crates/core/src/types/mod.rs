//! Primitive types for Delicious.
//!
//! Type-safe wrappers for entity identifiers and user-supplied email addresses.

pub mod email;
pub mod id;

pub use email::{Email, EmailError};
pub use id::*;
