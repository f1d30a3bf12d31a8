//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Store listing (first page)
//! GET  /stores                 - Store listing (?page=N, 6 per page)
//! GET  /add                    - Add store form (auth)
//! POST /add                    - Create store (auth, multipart)
//! POST /add/{id}               - Update store (auth + owner, multipart)
//! GET  /stores/{id}/edit       - Edit store form (auth + owner)
//! GET  /store/{slug}           - Store page with reviews
//! GET  /tags                   - Tag browser
//! GET  /tags/{tag}             - Stores with one tag
//! GET  /top                    - Top stores by rating (?limit=N, default 10, max 100)
//! GET  /hearts                 - Hearted stores (auth)
//! POST /reviews/{id}           - Add review (auth)
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login action (rate limited)
//! GET  /register               - Register page
//! POST /register               - Register action (rate limited)
//! POST /logout                 - Logout action
//! GET  /account                - Account page (auth)
//! POST /account                - Update name and email (auth)
//!
//! # JSON API
//! GET  /api/search?q=          - Text search, best 5
//! GET  /api/stores/near?lat=&lng= - Nearest 10 stores within 50 km
//! POST /api/stores/{id}/heart  - Toggle heart (auth)
//!
//! # Health
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (database reachable)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod hearts;
pub mod reviews;
pub mod stores;
pub mod tags;
pub mod top;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Redirect to `path` with an `error` message for the next page to show.
pub(crate) fn redirect_with_error(path: &str, message: &str) -> Response {
    redirect_with(path, "error", message)
}

/// Redirect to `path` with a `success` message for the next page to show.
pub(crate) fn redirect_with_success(path: &str, message: &str) -> Response {
    redirect_with(path, "success", message)
}

fn redirect_with(path: &str, key: &str, message: &str) -> Response {
    let separator = if path.contains('?') { '&' } else { '?' };
    let location = format!("{path}{separator}{key}={}", urlencoding::encode(message));
    Redirect::to(&location).into_response()
}

/// Create the auth routes router.
///
/// Only the form submissions are rate limited; the pages themselves are not.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
        .route("/account", get(account::index).post(account::update))
}

/// Create the store catalog routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .route("/stores/{id}/edit", get(stores::edit_page))
        .route("/store/{slug}", get(stores::show))
        .route("/tags", get(tags::index))
        .route("/tags/{tag}", get(tags::show))
        .route("/top", get(top::index))
        .route("/hearts", get(hearts::index))
        .route("/reviews/{id}", post(reviews::create))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route("/stores/near", get(api::near))
        .route("/stores/{id}/heart", post(api::heart))
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(store_routes())
        .merge(auth_routes())
        .nest("/api", api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    #[test]
    fn test_redirect_encodes_message() {
        let response = redirect_with_error("/add", "you must supply an address");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "/add?error=you%20must%20supply%20an%20address"
        );
    }

    #[test]
    fn test_redirect_appends_to_existing_query() {
        let response = redirect_with_success("/stores?page=2", "Done");
        assert_eq!(response.headers()[LOCATION], "/stores?page=2&success=Done");
    }
}
