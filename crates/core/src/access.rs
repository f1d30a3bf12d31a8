//! Ownership checks for store mutation.
//!
//! Only a store's author may edit it. The check returns a typed failure for
//! the HTTP boundary to render instead of aborting the request itself.

use thiserror::Error;

use crate::types::{StoreId, UserId};

/// The acting user does not own the store.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("you must own store {store} in order to edit it")]
pub struct OwnershipError {
    pub store: StoreId,
    pub actor: UserId,
}

/// Confirm that `actor` authored the store.
///
/// # Errors
///
/// Returns `OwnershipError` when `actor` differs from `author`.
pub fn confirm_owner(store: StoreId, author: UserId, actor: UserId) -> Result<(), OwnershipError> {
    if author == actor {
        Ok(())
    } else {
        Err(OwnershipError { store, actor })
    }
}
