//! Review submission handler.

use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use serde::Deserialize;

use delicious_core::StoreId;

use crate::db::StoreRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::routes::{redirect_with_error, redirect_with_success};
use crate::services::{CatalogError, CatalogService};
use crate::state::AppState;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub text: String,
    /// Star radio buttons; missing when none was picked.
    pub rating: Option<String>,
}

/// Handle a review for the store with `id`.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let store = StoreRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;
    let store_path = format!("/store/{}", store.slug);

    let Some(rating) = form.rating.as_deref().and_then(|r| r.trim().parse::<i16>().ok()) else {
        return Ok(redirect_with_error(&store_path, "Please pick a star rating"));
    };

    match CatalogService::new(state.pool(), state.photos())
        .add_review(store.id, user.id, &form.text, rating)
        .await
    {
        Ok(_) => Ok(redirect_with_success(&store_path, "Review saved!")),
        Err(e @ (CatalogError::EmptyReview | CatalogError::Rating(_))) => {
            Ok(redirect_with_error(&store_path, &e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
