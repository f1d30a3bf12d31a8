//! Delicious Core - store catalog domain library.
//!
//! This crate provides the types and rules shared by every Delicious component:
//! - `web` - The public store listing site
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Storage-backed operations accept their lookups as closures
//! so they can run against PostgreSQL in production and plain vectors in tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and validated email addresses
//! - [`slug`] - Slug derivation and uniqueness suffixing
//! - [`geo`] - Coordinates, great-circle distance, and proximity queries
//! - [`catalog`] - Store, review, and aggregation result records
//! - [`ranking`] - Parameters of the top-stores ranking
//! - [`access`] - Ownership checks for store mutation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod catalog;
pub mod geo;
pub mod ranking;
pub mod slug;
pub mod types;

pub use access::{OwnershipError, confirm_owner};
pub use catalog::{
    Pagination, Rating, RatingError, Review, Store, StoreDraft, StoreError, StoreInput,
    StoreWithRating, StoreWithReviews, TagCount, STORE_TAGS,
};
pub use geo::{BoundingBox, Coordinates, GeoError, Location, NearbyQuery, build_nearby_query};
pub use ranking::TopStoresQuery;
pub use slug::{SlugCandidate, SlugError, assign_slug, slugify};
pub use types::*;
