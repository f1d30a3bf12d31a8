//! Business logic services for the site.
//!
//! # Services
//!
//! - `auth` - Registration, login, and account updates
//! - `catalog` - Store creation, editing, and reviews
//! - `uploads` - Store photo storage

pub mod auth;
pub mod catalog;
pub mod uploads;

pub use auth::{AuthError, AuthService, Registration};
pub use catalog::{CatalogError, CatalogService};
pub use uploads::{PhotoStore, PhotoUpload, UploadError};
