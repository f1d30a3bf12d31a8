//! Integration tests for Delicious.
//!
//! # Running Tests
//!
//! ```bash
//! # Router tests need nothing running
//! cargo test -p delicious-integration-tests
//!
//! # Repository tests also need a disposable PostgreSQL database
//! TEST_DATABASE_URL=postgres://localhost/delicious_test cargo test -p delicious-integration-tests
//! ```
//!
//! Repository tests truncate every catalog table before they run. They are
//! skipped when `TEST_DATABASE_URL` is unset.
//!
//! # Test Categories
//!
//! - `routes` - Requests through the full router, no database
//! - `catalog` - Store, review, and heart repositories against `PostgreSQL`

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::sync::LazyLock;

use axum::Router;
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{Mutex, MutexGuard};
use url::Url;

use delicious_core::{Email, StoreDraft, StoreInput};
use delicious_web::config::WebConfig;
use delicious_web::db::{MIGRATOR, UserRepository};
use delicious_web::models::User;
use delicious_web::state::AppState;

/// Never connected to; the router tests stop before any query.
const UNREACHABLE_DATABASE_URL: &str = "postgres://delicious@127.0.0.1:1/unreachable";

/// Serializes tests that truncate the shared database.
static DATABASE_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Site configuration pointing at `database_url`.
#[must_use]
pub fn test_config(database_url: &str) -> WebConfig {
    WebConfig {
        database_url: SecretString::from(database_url.to_string()),
        host: [127, 0, 0, 1].into(),
        port: 7777,
        base_url: Url::parse("http://localhost:7777").expect("valid base url"),
        upload_dir: std::env::temp_dir().join(format!("delicious-test-{}", uuid::Uuid::new_v4())),
        max_upload_bytes: 1024 * 1024,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Full router over a lazily connected pool that is never used.
#[must_use]
pub fn offline_app() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy(UNREACHABLE_DATABASE_URL)
        .expect("lazy pool");
    delicious_web::build_router(AppState::new(test_config(UNREACHABLE_DATABASE_URL), pool))
}

/// A migrated, emptied test database held exclusively for one test.
pub struct TestDatabase {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

impl TestDatabase {
    /// Connect to `TEST_DATABASE_URL`, or `None` when it is unset.
    pub async fn connect() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let guard = DATABASE_LOCK.lock().await;

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .expect("connect to TEST_DATABASE_URL");
        MIGRATOR.run(&pool).await.expect("run migrations");
        sqlx::query(
            "TRUNCATE hearts, reviews, stores, user_passwords, users RESTART IDENTITY CASCADE",
        )
        .execute(&pool)
        .await
        .expect("truncate tables");

        Some(Self {
            pool,
            _guard: guard,
        })
    }

    /// Register a user with a throwaway password hash.
    pub async fn user(&self, name: &str, email: &str) -> User {
        let email = Email::parse(email).expect("valid email");
        UserRepository::new(&self.pool)
            .create_with_password(name, &email, "not-a-real-hash")
            .await
            .expect("create user")
    }

    /// App router backed by this database.
    #[must_use]
    pub fn app(&self) -> Router {
        delicious_web::build_router(AppState::new(test_config("postgres://test"), self.pool.clone()))
    }
}

/// A valid store draft at `longitude`/`latitude`.
#[must_use]
pub fn draft(name: &str, longitude: f64, latitude: f64, tags: &[&str]) -> StoreDraft {
    StoreInput {
        name: name.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
        address: "1 Test Street".to_string(),
        longitude,
        latitude,
        ..StoreInput::default()
    }
    .validate()
    .expect("valid store input")
}
