//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Rating, Review, ReviewId, StoreId, UserId};

use super::RepositoryError;

/// Internal row type for a review joined to its author's name.
#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    store_id: StoreId,
    author_id: UserId,
    author_name: String,
    text: String,
    rating: i16,
    created: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(row.rating).map_err(|e| {
            RepositoryError::DataCorruption(format!("review {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            store: row.store_id,
            author: row.author_id,
            author_name: row.author_name,
            text: row.text,
            rating,
            created: row.created,
        })
    }
}

fn into_reviews(rows: Vec<ReviewRow>) -> Result<Vec<Review>, RepositoryError> {
    rows.into_iter().map(Review::try_from).collect()
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Leave a review on a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, text), fields(store_id = %store, author = %author))]
    pub async fn create(
        &self,
        store: StoreId,
        author: UserId,
        text: &str,
        rating: Rating,
    ) -> Result<Review, RepositoryError> {
        let row: ReviewRow = sqlx::query_as(
            r"
            WITH inserted AS (
                INSERT INTO reviews (store_id, author_id, text, rating)
                VALUES ($1, $2, $3, $4)
                RETURNING id, store_id, author_id, text, rating, created
            )
            SELECT i.id, i.store_id, i.author_id, u.name AS author_name,
                   i.text, i.rating, i.created
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            ",
        )
        .bind(store)
        .bind(author)
        .bind(text)
        .bind(i16::from(rating))
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        Review::try_from(row)
    }

    /// Reviews of one store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT r.id, r.store_id, r.author_id, u.name AS author_name,
                   r.text, r.rating, r.created
            FROM reviews r
            JOIN users u ON u.id = r.author_id
            WHERE r.store_id = $1
            ORDER BY r.created DESC, r.id DESC
            ",
        )
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        into_reviews(rows)
    }

    /// Reviews of several stores at once, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_stores(&self, stores: &[StoreId]) -> Result<Vec<Review>, RepositoryError> {
        if stores.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = stores.iter().map(|id| id.as_i32()).collect();

        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT r.id, r.store_id, r.author_id, u.name AS author_name,
                   r.text, r.rating, r.created
            FROM reviews r
            JOIN users u ON u.id = r.author_id
            WHERE r.store_id = ANY($1)
            ORDER BY r.created DESC, r.id DESC
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        into_reviews(rows)
    }
}
