//! Domain models owned by the web crate.
//!
//! Store catalog records live in `delicious-core`; accounts and session state
//! are local to the site.

pub mod session;
pub mod user;

pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
