//! Hearted stores page.

use axum::extract::{Query, State};

use crate::db::HeartRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::routes::MessageQuery;
use crate::routes::stores::{StoresTemplate, store_cards};
use crate::state::AppState;

/// Display the stores the user has hearted.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<StoresTemplate> {
    let stores = HeartRepository::new(state.pool()).stores(user.id).await?;
    let stores = store_cards(&state, Some(&user), &stores).await?;

    Ok(StoresTemplate {
        user: Some(user),
        error: query.error,
        success: query.success,
        title: "Hearted Stores".to_string(),
        stores,
        pagination: None,
    })
}
