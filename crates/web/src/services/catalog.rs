//! Store catalog service: validation and ownership around the repositories.

use sqlx::PgPool;
use thiserror::Error;

use delicious_core::{
    OwnershipError, Rating, RatingError, Review, Store, StoreDraft, StoreError, StoreId,
    StoreInput, UserId, confirm_owner,
};

use crate::db::{RepositoryError, ReviewRepository, StoreRepository};
use crate::services::uploads::{PhotoStore, PhotoUpload, UploadError};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Store fields failed validation.
    #[error(transparent)]
    Invalid(#[from] StoreError),

    /// Review rating outside 1..=5.
    #[error(transparent)]
    Rating(#[from] RatingError),

    /// Review text left blank.
    #[error("please write something about the store")]
    EmptyReview,

    /// Actor does not own the store.
    #[error(transparent)]
    Forbidden(#[from] OwnershipError),

    /// Photo could not be stored.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Store does not exist.
    #[error("store not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Store catalog service.
pub struct CatalogService<'a> {
    stores: StoreRepository<'a>,
    reviews: ReviewRepository<'a>,
    photos: &'a PhotoStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, photos: &'a PhotoStore) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            reviews: ReviewRepository::new(pool),
            photos,
        }
    }

    /// Write the photo, if any, once the rest of the input is known good.
    async fn attach_photo(
        &self,
        draft: &mut StoreDraft,
        photo: Option<PhotoUpload>,
    ) -> Result<(), CatalogError> {
        if let Some(photo) = photo {
            draft.photo = Some(self.photos.save(&photo.content_type, &photo.bytes).await?);
        }
        Ok(())
    }

    /// Delete a photo written for a store write that then failed.
    async fn discard_photo(&self, draft: &StoreDraft) {
        if let Some(filename) = &draft.photo {
            if let Err(e) = self.photos.remove(filename).await {
                tracing::warn!(filename = %filename, error = %e, "Failed to remove orphaned photo");
            }
        }
    }

    /// Validate and insert a new store owned by `author`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad input, `CatalogError::Upload`
    /// for a rejected photo, or a repository error.
    pub async fn create_store(
        &self,
        author: UserId,
        input: StoreInput,
        photo: Option<PhotoUpload>,
    ) -> Result<Store, CatalogError> {
        let mut draft = input.validate()?;
        self.attach_photo(&mut draft, photo).await?;
        let store = match self.stores.create(&draft, author).await {
            Ok(store) => store,
            Err(e) => {
                self.discard_photo(&draft).await;
                return Err(e.into());
            }
        };
        tracing::info!(store_id = %store.id, slug = %store.slug, "Store created");
        Ok(store)
    }

    /// Load a store for editing, checking that `editor` owns it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::Forbidden`.
    pub async fn store_for_edit(
        &self,
        id: StoreId,
        editor: UserId,
    ) -> Result<Store, CatalogError> {
        let store = self.stores.get_by_id(id).await?.ok_or(CatalogError::NotFound)?;
        confirm_owner(store.id, store.author, editor)?;
        Ok(store)
    }

    /// Validate and apply an edit by `editor`.
    ///
    /// Ownership is checked before the input is validated. Without a new
    /// photo the current one is kept.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound`, `CatalogError::Forbidden`,
    /// `CatalogError::Invalid`, `CatalogError::Upload`, or a repository error.
    pub async fn update_store(
        &self,
        id: StoreId,
        editor: UserId,
        input: StoreInput,
        photo: Option<PhotoUpload>,
    ) -> Result<Store, CatalogError> {
        self.store_for_edit(id, editor).await?;
        let mut draft = input.validate()?;
        draft.photo = None;
        self.attach_photo(&mut draft, photo).await?;
        let store = match self.stores.update(id, &draft).await {
            Ok(store) => store,
            Err(e) => {
                self.discard_photo(&draft).await;
                return Err(e.into());
            }
        };
        tracing::info!(store_id = %store.id, slug = %store.slug, "Store updated");
        Ok(store)
    }

    /// Leave a review on a store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyReview` or `CatalogError::Rating` for bad
    /// input and `CatalogError::NotFound` when the store doesn't exist.
    pub async fn add_review(
        &self,
        store: StoreId,
        author: UserId,
        text: &str,
        rating: i16,
    ) -> Result<Review, CatalogError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CatalogError::EmptyReview);
        }
        let rating = Rating::new(rating)?;
        Ok(self.reviews.create(store, author, text, rating).await?)
    }
}
