//! Catalog repositories and services against `PostgreSQL`.
//!
//! Skipped unless `TEST_DATABASE_URL` points at a disposable database.

#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::print_stderr)]

use axum::body::{Body, Bytes, to_bytes};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use delicious_core::geo::EARTH_RADIUS_METERS;
use delicious_core::{NearbyQuery, Pagination, Rating, StoreInput, TopStoresQuery};
use delicious_integration_tests::{TestDatabase, draft};
use delicious_web::db::{HeartRepository, RepositoryError, ReviewRepository, StoreRepository};
use delicious_web::error::AppError;
use delicious_web::services::{CatalogError, CatalogService, PhotoStore, PhotoUpload};

macro_rules! database {
    () => {
        match TestDatabase::connect().await {
            Some(db) => db,
            None => {
                eprintln!("TEST_DATABASE_URL not set; skipping");
                return;
            }
        }
    };
}

/// Make inserts and updates of two store names fail with a unique violation,
/// the way a concurrent writer taking the same slug would.
///
/// "Always Taken" is rejected on every attempt; "Taken Once" only on the
/// first. Each rejection is counted in a sequence.
async fn reject_slugs_for_test_names(pool: &sqlx::PgPool) {
    for statement in [
        "DROP TRIGGER IF EXISTS stores_reject_test_slugs ON stores",
        "DROP SEQUENCE IF EXISTS always_taken_attempts",
        "DROP SEQUENCE IF EXISTS taken_once_attempts",
        "CREATE SEQUENCE always_taken_attempts",
        "CREATE SEQUENCE taken_once_attempts",
        r"
        CREATE OR REPLACE FUNCTION reject_test_slugs() RETURNS trigger AS $$
        BEGIN
            IF NEW.name = 'Always Taken' THEN
                PERFORM nextval('always_taken_attempts');
                RAISE EXCEPTION 'slug taken' USING ERRCODE = 'unique_violation';
            END IF;
            IF NEW.name = 'Taken Once' AND nextval('taken_once_attempts') = 1 THEN
                RAISE EXCEPTION 'slug taken' USING ERRCODE = 'unique_violation';
            END IF;
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql
        ",
        "CREATE TRIGGER stores_reject_test_slugs BEFORE INSERT OR UPDATE ON stores \
         FOR EACH ROW EXECUTE FUNCTION reject_test_slugs()",
    ] {
        sqlx::query(statement).execute(pool).await.unwrap();
    }
}

async fn drop_slug_rejection(pool: &sqlx::PgPool) {
    sqlx::query("DROP TRIGGER IF EXISTS stores_reject_test_slugs ON stores")
        .execute(pool)
        .await
        .unwrap();
}

async fn sequence_value(pool: &sqlx::PgPool, name: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT last_value FROM {name}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Latitude `meters` due north of `latitude`.
fn north(latitude: f64, meters: f64) -> f64 {
    latitude + (meters / EARTH_RADIUS_METERS).to_degrees()
}

#[tokio::test]
async fn test_duplicate_names_get_numbered_slugs() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);

    let first = repo.create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id).await.unwrap();
    let second = repo.create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id).await.unwrap();
    let third = repo.create(&draft("cafe luna!", 0.0, 0.0, &[]), author.id).await.unwrap();

    assert_eq!(first.slug, "cafe-luna");
    assert_eq!(second.slug, "cafe-luna-2");
    assert_eq!(third.slug, "cafe-luna-3");
}

#[tokio::test]
async fn test_create_after_rename_skips_slug_still_held() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);

    let first = repo.create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id).await.unwrap();
    let second = repo.create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id).await.unwrap();
    assert_eq!(second.slug, "cafe-luna-2");
    repo.update(first.id, &draft("Other", 0.0, 0.0, &[])).await.unwrap();

    let third = repo.create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id).await.unwrap();
    assert_eq!(third.slug, "cafe-luna-3");
    let fourth = repo.create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id).await.unwrap();
    assert_eq!(fourth.slug, "cafe-luna-4");
}

#[tokio::test]
async fn test_slug_conflict_is_retried() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    reject_slugs_for_test_names(&db.pool).await;

    let result = StoreRepository::new(&db.pool)
        .create(&draft("Taken Once", 0.0, 0.0, &[]), author.id)
        .await;
    drop_slug_rejection(&db.pool).await;

    assert_eq!(result.unwrap().slug, "taken-once");
    assert_eq!(sequence_value(&db.pool, "taken_once_attempts").await, 2);
}

#[tokio::test]
async fn test_slug_conflict_gives_up_after_three_attempts() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);
    let existing = repo.create(&draft("Plain", 0.0, 0.0, &[]), author.id).await.unwrap();
    reject_slugs_for_test_names(&db.pool).await;

    let created = repo
        .create(&draft("Always Taken", 0.0, 0.0, &[]), author.id)
        .await;
    let renamed = repo
        .update(existing.id, &draft("Always Taken", 0.0, 0.0, &[]))
        .await;
    drop_slug_rejection(&db.pool).await;

    let err = created.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert_eq!(AppError::from(err).status(), StatusCode::CONFLICT);
    assert!(matches!(renamed, Err(RepositoryError::Conflict(_))));
    assert_eq!(sequence_value(&db.pool, "always_taken_attempts").await, 6);

    let kept = repo.get_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(kept.slug, "plain");
}

#[tokio::test]
async fn test_failed_create_removes_uploaded_photo() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let photos = PhotoStore::new(
        std::env::temp_dir().join(format!("delicious-orphans-{}", uuid::Uuid::new_v4())),
        1024,
    );
    photos.ensure_dir().await.unwrap();
    reject_slugs_for_test_names(&db.pool).await;

    let input = StoreInput {
        name: "Always Taken".to_string(),
        address: "12 Main St".to_string(),
        ..StoreInput::default()
    };
    let upload = PhotoUpload {
        content_type: "image/png".to_string(),
        bytes: Bytes::from_static(b"\x89PNG"),
    };
    let result = CatalogService::new(&db.pool, &photos)
        .create_store(author.id, input, Some(upload))
        .await;
    drop_slug_rejection(&db.pool).await;

    assert!(matches!(result, Err(CatalogError::Repository(RepositoryError::Conflict(_)))));
    let mut entries = tokio::fs::read_dir(photos.dir()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
    tokio::fs::remove_dir_all(photos.dir()).await.unwrap();
}

#[tokio::test]
async fn test_update_keeps_slug_unless_renamed() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);

    let store = repo.create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id).await.unwrap();

    let mut same_name = draft("Cafe Luna", 1.0, 1.0, &["Wifi"]);
    same_name.description = Some("Now with wifi".to_string());
    let updated = repo.update(store.id, &same_name).await.unwrap();
    assert_eq!(updated.slug, "cafe-luna");
    assert_eq!(updated.tags, ["Wifi"]);
    assert_eq!(updated.author, author.id);

    let renamed = repo.update(store.id, &draft("Cafe Sol", 1.0, 1.0, &[])).await.unwrap();
    assert_eq!(renamed.slug, "cafe-sol");
    assert_eq!(renamed.created, store.created);
}

#[tokio::test]
async fn test_slug_lookup_is_case_insensitive_and_joins_reviews_on_request() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let store = StoreRepository::new(&db.pool)
        .create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id)
        .await
        .unwrap();
    ReviewRepository::new(&db.pool)
        .create(store.id, author.id, "Great", Rating::new(5).unwrap())
        .await
        .unwrap();

    let repo = StoreRepository::new(&db.pool);
    let bare = repo.get_by_slug("CAFE-LUNA", false).await.unwrap().unwrap();
    assert!(bare.reviews.is_none());

    let joined = repo.get_by_slug("cafe-luna", true).await.unwrap().unwrap();
    let reviews = joined.reviews.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].author_name, "Wes");

    assert!(repo.get_by_slug("missing", true).await.unwrap().is_none());
}

#[tokio::test]
async fn test_listing_pages_newest_first() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);
    for n in 1..=8 {
        repo.create(&draft(&format!("Store {n}"), 0.0, 0.0, &[]), author.id)
            .await
            .unwrap();
    }

    let total = repo.count().await.unwrap();
    assert_eq!(total, 8);

    let first = repo.list(&Pagination::new(1, 6, total)).await.unwrap();
    let second = repo.list(&Pagination::new(2, 6, total)).await.unwrap();
    assert_eq!(first.len(), 6);
    assert_eq!(second.len(), 2);
    assert_eq!(first[0].name, "Store 8");
    assert_eq!(second[1].name, "Store 1");
}

#[tokio::test]
async fn test_tag_counts_sum_to_tag_occurrences() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);
    repo.create(&draft("A", 0.0, 0.0, &["Wifi", "Open Late"]), author.id).await.unwrap();
    repo.create(&draft("B", 0.0, 0.0, &["Wifi"]), author.id).await.unwrap();
    repo.create(&draft("C", 0.0, 0.0, &[]), author.id).await.unwrap();

    let counts = repo.tag_counts().await.unwrap();
    let pairs: Vec<(&str, i64)> = counts.iter().map(|c| (c.tag.as_str(), c.count)).collect();
    assert_eq!(pairs, [("Wifi", 2), ("Open Late", 1)]);
    assert_eq!(counts.iter().map(|c| c.count).sum::<i64>(), 3);

    let wifi = repo.by_tag(Some("Wifi")).await.unwrap();
    assert_eq!(wifi.len(), 2);
    let tagged = repo.by_tag(None).await.unwrap();
    assert!(tagged.iter().all(|s| !s.tags.is_empty()));
    assert_eq!(tagged.len(), 2);
}

#[tokio::test]
async fn test_top_stores_need_two_reviews_and_sort_by_average() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let stores = StoreRepository::new(&db.pool);
    let reviews = ReviewRepository::new(&db.pool);

    let a = stores.create(&draft("A", 0.0, 0.0, &[]), author.id).await.unwrap();
    let b = stores.create(&draft("B", 0.0, 0.0, &[]), author.id).await.unwrap();
    let c = stores.create(&draft("C", 0.0, 0.0, &[]), author.id).await.unwrap();

    for (store, rating) in [(a.id, 5), (a.id, 4), (b.id, 5), (c.id, 1), (c.id, 3)] {
        reviews
            .create(store, author.id, "ok", Rating::new(rating).unwrap())
            .await
            .unwrap();
    }

    let top = stores.top_stores(TopStoresQuery::default()).await.unwrap();
    let names: Vec<&str> = top.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["A", "C"]);
    assert_eq!(top[0].average_rating, 4.5);
    assert_eq!(top[1].average_rating, 2.0);
    assert_eq!(top[0].reviews.len(), 2);
}

#[tokio::test]
async fn test_nearby_applies_50km_radius() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);
    let (lng, lat) = (-73.5673, 45.5017);

    repo.create(&draft("Here", lng, lat, &[]), author.id).await.unwrap();
    repo.create(&draft("Close", lng, north(lat, 49_000.0), &[]), author.id).await.unwrap();
    repo.create(&draft("Far", lng, north(lat, 50_500.0), &[]), author.id).await.unwrap();

    let found = repo.nearby(&NearbyQuery::new(lng, lat).unwrap()).await.unwrap();
    let names: Vec<&str> = found.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Here", "Close"]);
}

#[tokio::test]
async fn test_search_matches_name_and_description() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let repo = StoreRepository::new(&db.pool);

    let mut bakery = draft("Crumbs", 0.0, 0.0, &[]);
    bakery.description = Some("Sourdough and croissants".to_string());
    repo.create(&bakery, author.id).await.unwrap();
    repo.create(&draft("Coffee Corner", 0.0, 0.0, &[]), author.id).await.unwrap();

    let hits = repo.search("croissants").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Crumbs");
    assert!(repo.search("pizza").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_heart_toggle_round_trip() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let store = StoreRepository::new(&db.pool)
        .create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id)
        .await
        .unwrap();
    let hearts = HeartRepository::new(&db.pool);

    assert!(hearts.toggle(author.id, store.id).await.unwrap());
    assert_eq!(hearts.store_ids(author.id).await.unwrap(), [store.id]);
    assert!(!hearts.toggle(author.id, store.id).await.unwrap());
    assert!(hearts.stores(author.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_only_the_author_may_edit() {
    let db = database!();
    let owner = db.user("Wes", "wes@example.com").await;
    let other = db.user("Sam", "sam@example.com").await;
    let photos = PhotoStore::new(std::env::temp_dir(), 1024);
    let catalog = CatalogService::new(&db.pool, &photos);

    let input = StoreInput {
        name: "Cafe Luna".to_string(),
        address: "12 Main St".to_string(),
        longitude: -79.38,
        latitude: 43.65,
        ..StoreInput::default()
    };
    let store = catalog.create_store(owner.id, input.clone(), None).await.unwrap();

    let err = catalog.store_for_edit(store.id, other.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
    let err = catalog
        .update_store(store.id, other.id, input.clone(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));

    let renamed = StoreInput {
        name: "Cafe Sol".to_string(),
        ..input
    };
    let updated = catalog.update_store(store.id, owner.id, renamed, None).await.unwrap();
    assert_eq!(updated.name, "Cafe Sol");
    assert_eq!(updated.author, owner.id);
}

#[tokio::test]
async fn test_reviews_validate_rating_and_text() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    let photos = PhotoStore::new(std::env::temp_dir(), 1024);
    let catalog = CatalogService::new(&db.pool, &photos);
    let store = StoreRepository::new(&db.pool)
        .create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id)
        .await
        .unwrap();

    assert!(matches!(
        catalog.add_review(store.id, author.id, "Nice", 6).await,
        Err(CatalogError::Rating(_))
    ));
    assert!(matches!(
        catalog.add_review(store.id, author.id, "   ", 4).await,
        Err(CatalogError::EmptyReview)
    ));

    let review = catalog.add_review(store.id, author.id, " Nice ", 4).await.unwrap();
    assert_eq!(review.text, "Nice");
    assert_eq!(review.rating.get(), 4);
}

#[tokio::test]
async fn test_search_api_returns_name_and_slug() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    StoreRepository::new(&db.pool)
        .create(&draft("Cafe Luna", 0.0, 0.0, &[]), author.id)
        .await
        .unwrap();

    let response = db
        .app()
        .oneshot(Request::get("/api/search?q=luna").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json, serde_json::json!([{"name": "Cafe Luna", "slug": "cafe-luna"}]));
}

#[tokio::test]
async fn test_store_page_renders_and_missing_slug_is_404() {
    let db = database!();
    let author = db.user("Wes", "wes@example.com").await;
    StoreRepository::new(&db.pool)
        .create(&draft("Cafe Luna", 0.0, 0.0, &["Wifi"]), author.id)
        .await
        .unwrap();

    let app = db.app();
    let found = app
        .clone()
        .oneshot(Request::get("/store/cafe-luna").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(found.status(), StatusCode::OK);

    let missing = app
        .oneshot(Request::get("/store/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
