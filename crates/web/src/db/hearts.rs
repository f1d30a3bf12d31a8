//! Heart (favourite store) repository.

use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Store, StoreId, UserId};

use super::RepositoryError;
use super::stores::{StoreRow, into_stores};

/// Repository for a user's hearted stores.
pub struct HeartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HeartRepository<'a> {
    /// Create a new heart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add the store to the user's hearts, or remove it if already there.
    ///
    /// Returns whether the store is hearted afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self), fields(user_id = %user, store_id = %store))]
    pub async fn toggle(&self, user: UserId, store: StoreId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM hearts WHERE user_id = $1 AND store_id = $2")
            .bind(user)
            .bind(store)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                r"
                INSERT INTO hearts (user_id, store_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(user)
            .bind(store)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::NotFound
                }
                other => RepositoryError::Database(other),
            })?;
        }

        tx.commit().await?;

        Ok(removed == 0)
    }

    /// IDs of every store the user has hearted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn store_ids(&self, user: UserId) -> Result<Vec<StoreId>, RepositoryError> {
        let ids: Vec<StoreId> =
            sqlx::query_scalar("SELECT store_id FROM hearts WHERE user_id = $1 ORDER BY store_id")
                .bind(user)
                .fetch_all(self.pool)
                .await?;
        Ok(ids)
    }

    /// The user's hearted stores, most recently hearted first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stores(&self, user: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM hearts h JOIN stores s ON s.id = h.store_id \
             WHERE h.user_id = $1 \
             ORDER BY h.created_at DESC"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }
}
