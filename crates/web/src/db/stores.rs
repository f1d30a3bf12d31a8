//! Store repository: listings, slugs, and the catalog aggregations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{
    Coordinates, Location, NearbyQuery, Pagination, Review, Store, StoreDraft, StoreId,
    StoreWithRating, StoreWithReviews, TagCount, TopStoresQuery, UserId, assign_slug,
};

use super::{RepositoryError, ReviewRepository, conflict_on_unique, is_unique_violation};

/// Attempts at writing a store before a slug collision is reported.
const SLUG_ATTEMPTS: u32 = 3;

/// Rows returned by the typeahead search.
pub const SEARCH_LIMIT: i64 = 5;

/// Internal row type for the `stores` table.
#[derive(sqlx::FromRow)]
pub(crate) struct StoreRow {
    id: StoreId,
    name: String,
    slug: String,
    description: Option<String>,
    tags: Vec<String>,
    created: DateTime<Utc>,
    longitude: f64,
    latitude: f64,
    address: String,
    photo: Option<String>,
    author_id: UserId,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let coordinates = Coordinates::new(row.longitude, row.latitude).map_err(|e| {
            RepositoryError::DataCorruption(format!("store {} has bad coordinates: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            tags: row.tags,
            created: row.created,
            location: Location::point(coordinates, row.address),
            photo: row.photo,
            author: row.author_id,
        })
    }
}

pub(crate) fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct RankedRow {
    id: StoreId,
    name: String,
    slug: String,
    photo: Option<String>,
    average_rating: f64,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Slugs currently stored that match `pattern` case-insensitively,
    /// optionally ignoring one store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slugs_matching(
        &self,
        pattern: String,
        exclude: Option<StoreId>,
    ) -> Result<Vec<String>, RepositoryError> {
        let slugs: Vec<String> = sqlx::query_scalar(
            r"
            SELECT slug
            FROM stores
            WHERE slug ~* $1
              AND ($2::int IS NULL OR id <> $2)
            ",
        )
        .bind(pattern)
        .bind(exclude)
        .fetch_all(self.pool)
        .await?;

        Ok(slugs)
    }

    async fn unique_slug(
        &self,
        name: &str,
        exclude: Option<StoreId>,
    ) -> Result<String, RepositoryError> {
        assign_slug(name, |pattern| self.slugs_matching(pattern, exclude)).await
    }

    /// Insert a new store, assigning it a unique slug.
    ///
    /// A concurrent writer can claim the same slug between the lookup and the
    /// insert; the unique index rejects the loser, which re-runs the lookup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if every attempt collided.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, draft), fields(name = %draft.name, author = %author))]
    pub async fn create(&self, draft: &StoreDraft, author: UserId) -> Result<Store, RepositoryError> {
        let mut attempt = 1;
        loop {
            let slug = self.unique_slug(&draft.name, None).await?;
            let coordinates = draft.location.coordinates;

            let result: Result<StoreRow, sqlx::Error> = sqlx::query_as(concat!(
                "INSERT INTO stores AS s \
                    (name, slug, description, tags, longitude, latitude, address, photo, author_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 RETURNING ",
                store_columns!()
            ))
            .bind(&draft.name)
            .bind(&slug)
            .bind(&draft.description)
            .bind(&draft.tags)
            .bind(coordinates.longitude())
            .bind(coordinates.latitude())
            .bind(&draft.location.address)
            .bind(&draft.photo)
            .bind(author)
            .fetch_one(self.pool)
            .await;

            match result {
                Ok(row) => return Store::try_from(row),
                Err(e) if is_unique_violation(&e) && attempt < SLUG_ATTEMPTS => {
                    tracing::warn!(slug = %slug, attempt, "Slug taken concurrently, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(conflict_on_unique(e, "slug")),
            }
        }
    }

    /// Overwrite a store's editable fields.
    ///
    /// The slug is recomputed only when the name changed; the store's own slug
    /// is not counted against it. The author never changes, and a `None` photo
    /// keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Conflict` if every slug attempt collided.
    #[instrument(skip(self, draft), fields(store_id = %id))]
    pub async fn update(&self, id: StoreId, draft: &StoreDraft) -> Result<Store, RepositoryError> {
        let current = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;
        let rename = current.name != draft.name;

        let mut attempt = 1;
        loop {
            let slug = if rename {
                self.unique_slug(&draft.name, Some(id)).await?
            } else {
                current.slug.clone()
            };
            let coordinates = draft.location.coordinates;

            let result: Result<Option<StoreRow>, sqlx::Error> = sqlx::query_as(concat!(
                "UPDATE stores AS s \
                 SET name = $2, slug = $3, description = $4, tags = $5, \
                     longitude = $6, latitude = $7, address = $8, \
                     photo = COALESCE($9, s.photo) \
                 WHERE s.id = $1 \
                 RETURNING ",
                store_columns!()
            ))
            .bind(id)
            .bind(&draft.name)
            .bind(&slug)
            .bind(&draft.description)
            .bind(&draft.tags)
            .bind(coordinates.longitude())
            .bind(coordinates.latitude())
            .bind(&draft.location.address)
            .bind(&draft.photo)
            .fetch_optional(self.pool)
            .await;

            match result {
                Ok(row) => return row.ok_or(RepositoryError::NotFound).and_then(Store::try_from),
                Err(e) if rename && is_unique_violation(&e) && attempt < SLUG_ATTEMPTS => {
                    tracing::warn!(slug = %slug, attempt, "Slug taken concurrently, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(conflict_on_unique(e, "slug")),
            }
        }
    }

    /// Get a store by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM stores s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }

    /// Get a store by slug, joining its reviews when `with_reviews` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(
        &self,
        slug: &str,
        with_reviews: bool,
    ) -> Result<Option<StoreWithReviews>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM stores s WHERE lower(s.slug) = lower($1)"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let store = Store::try_from(row)?;

        let reviews = if with_reviews {
            Some(ReviewRepository::new(self.pool).for_store(store.id).await?)
        } else {
            None
        };

        Ok(Some(StoreWithReviews { store, reviews }))
    }

    /// Total number of stores.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: &Pagination) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM stores s ORDER BY s.created DESC, s.id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.per_page))
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Number of stores carrying each tag, most used first.
    ///
    /// Tags with equal counts are ordered by name. Stores without tags
    /// contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT tag, COUNT(*) AS count
            FROM stores, unnest(tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect())
    }

    /// Stores carrying `tag`, or every store with at least one tag when no
    /// tag is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM stores s \
             WHERE ($1::text IS NULL AND cardinality(s.tags) > 0) OR $1 = ANY(s.tags) \
             ORDER BY s.created DESC, s.id DESC"
        ))
        .bind(tag)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Highest-rated stores with at least two reviews.
    ///
    /// Each row carries its reviews and their mean rating; rows are sorted by
    /// that mean, highest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    #[instrument(skip(self))]
    pub async fn top_stores(
        &self,
        query: TopStoresQuery,
    ) -> Result<Vec<StoreWithRating>, RepositoryError> {
        let ranked: Vec<RankedRow> = sqlx::query_as(
            r"
            SELECT s.id, s.name, s.slug, s.photo, AVG(r.rating)::float8 AS average_rating
            FROM stores s
            JOIN reviews r ON r.store_id = s.id
            GROUP BY s.id
            HAVING COUNT(r.id) >= $1
            ORDER BY average_rating DESC
            LIMIT $2
            ",
        )
        .bind(query.min_reviews())
        .bind(query.limit())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<StoreId> = ranked.iter().map(|row| row.id).collect();
        let mut by_store: HashMap<StoreId, Vec<Review>> = HashMap::new();
        for review in ReviewRepository::new(self.pool).for_stores(&ids).await? {
            by_store.entry(review.store).or_default().push(review);
        }

        Ok(ranked
            .into_iter()
            .map(|row| StoreWithRating {
                reviews: by_store.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                slug: row.slug,
                photo: row.photo,
                average_rating: row.average_rating,
            })
            .collect())
    }

    /// Stores within the query radius, nearest first.
    ///
    /// The bounding box narrows candidates on the position index; the
    /// haversine distance then applies the exact radius.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<Store>, RepositoryError> {
        let center = query.center();
        let bbox = query.bounding_box();

        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM ( \
                 SELECT *, 2 * $1 * asin(least(1, sqrt( \
                     power(sin(radians(latitude - $3) / 2), 2) \
                     + cos(radians($3)) * cos(radians(latitude)) \
                       * power(sin(radians(longitude - $2) / 2), 2) \
                 ))) AS distance \
                 FROM stores \
                 WHERE latitude BETWEEN $4 AND $5 \
                   AND longitude BETWEEN $6 AND $7 \
             ) s \
             WHERE s.distance <= $8 \
             ORDER BY s.distance ASC, s.id ASC \
             LIMIT $9"
        ))
        .bind(delicious_core::geo::EARTH_RADIUS_METERS)
        .bind(center.longitude())
        .bind(center.latitude())
        .bind(bbox.min_latitude)
        .bind(bbox.max_latitude)
        .bind(bbox.min_longitude)
        .bind(bbox.max_longitude)
        .bind(query.max_distance_meters())
        .bind(query.limit())
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Full-text search over store names and descriptions, best match first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, q: &str) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM stores s, websearch_to_tsquery('english', $1) AS query \
             WHERE s.search @@ query \
             ORDER BY ts_rank(s.search, query) DESC, s.id ASC \
             LIMIT $2"
        ))
        .bind(q)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }
}
