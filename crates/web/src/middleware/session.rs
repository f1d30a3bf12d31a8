//! Login sessions for Delicious accounts.
//!
//! Sessions live in the `tower_sessions.session` table and hold a single
//! `current_user` entry, written by `set_current_user` after the session ID
//! is cycled on login. The `delicious_session` cookie expires after 14 days
//! without a request, is `HttpOnly` and `SameSite=Lax` so following a shared
//! store link keeps the visitor signed in, and is marked `Secure` only when
//! `DELICIOUS_BASE_URL` is an `https` URL.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "delicious_session";

/// Inactivity window before a login lapses.
const SESSION_IDLE_LIMIT: Duration = Duration::days(14);

/// Build the session layer over the shared pool.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &WebConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(SESSION_IDLE_LIMIT))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_limit_is_two_weeks() {
        assert_eq!(SESSION_IDLE_LIMIT.whole_seconds(), 14 * 24 * 60 * 60);
    }
}
