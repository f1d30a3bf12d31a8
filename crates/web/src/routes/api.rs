//! JSON API handlers: typeahead search, nearby stores, and hearts.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use delicious_core::{Location, NearbyQuery, Store, StoreId};

use crate::db::{HeartRepository, StoreRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Query parameters for search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// A search hit.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub slug: String,
}

/// Query parameters for the nearby search.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// A store near the requested point.
#[derive(Debug, Serialize)]
pub struct NearbyStore {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub location: Location,
    pub photo: Option<String>,
}

impl From<Store> for NearbyStore {
    fn from(store: Store) -> Self {
        Self {
            name: store.name,
            slug: store.slug,
            description: store.description,
            location: store.location,
            photo: store.photo,
        }
    }
}

/// Result of toggling a heart.
#[derive(Debug, Serialize)]
pub struct HeartResponse {
    pub hearted: bool,
    pub hearts: Vec<StoreId>,
}

/// Search store names and descriptions. A blank query matches nothing.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let stores = StoreRepository::new(state.pool()).search(q).await?;
    Ok(Json(
        stores
            .into_iter()
            .map(|s| SearchHit {
                name: s.name,
                slug: s.slug,
            })
            .collect(),
    ))
}

/// Stores within 50 km of `lat`/`lng`, nearest first.
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<NearbyStore>>> {
    let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
        return Err(AppError::Validation("lat and lng are required".to_string()));
    };
    let nearby = NearbyQuery::new(lng, lat)?;

    let stores = StoreRepository::new(state.pool()).nearby(&nearby).await?;
    Ok(Json(stores.into_iter().map(NearbyStore::from).collect()))
}

/// Heart or un-heart a store for the current user.
pub async fn heart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
) -> Result<Json<HeartResponse>> {
    let repo = HeartRepository::new(state.pool());
    let hearted = repo.toggle(user.id, id).await?;
    let hearts = repo.store_ids(user.id).await?;

    let store_id = id.to_string();
    add_breadcrumb(
        "catalog",
        if hearted { "Hearted store" } else { "Removed heart" },
        Some(&[("store_id", store_id.as_str())]),
    );

    Ok(Json(HeartResponse { hearted, hearts }))
}
