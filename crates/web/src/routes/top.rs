//! Top stores handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;

use delicious_core::{StoreWithRating, TopStoresQuery};

use crate::db::StoreRepository;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// One row of the ranking table.
#[derive(Debug, Clone)]
pub struct RankedStoreView {
    pub position: usize,
    pub name: String,
    pub slug: String,
    pub photo: Option<String>,
    pub review_count: usize,
    pub average_rating: String,
}

impl RankedStoreView {
    fn new(position: usize, row: StoreWithRating) -> Self {
        Self {
            position,
            review_count: row.reviews.len(),
            average_rating: format!("{:.1}", row.average_rating),
            name: row.name,
            slug: row.slug,
            photo: row.photo,
        }
    }
}

/// Top stores template.
#[derive(Template, WebTemplate)]
#[template(path = "top.html")]
pub struct TopTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
    pub stores: Vec<RankedStoreView>,
}

/// Query parameters for the ranking page.
#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl TopQuery {
    /// Requested limit, clamped; the default ranking without one.
    fn stores_query(&self) -> TopStoresQuery {
        self.limit
            .map_or_else(TopStoresQuery::default, TopStoresQuery::with_limit)
    }
}

/// Display the highest-rated stores.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<TopQuery>,
) -> Result<TopTemplate> {
    let query = params.stores_query();
    let ranked = StoreRepository::new(state.pool()).top_stores(query).await?;

    Ok(TopTemplate {
        user,
        error: params.error,
        success: params.success,
        title: format!("Top {} Stores", query.limit()),
        stores: ranked
            .into_iter()
            .enumerate()
            .map(|(i, row)| RankedStoreView::new(i + 1, row))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use delicious_core::StoreId;

    use super::*;

    #[test]
    fn test_view_rounds_average() {
        let row = StoreWithRating {
            id: StoreId::new(1),
            name: "A".to_string(),
            slug: "a".to_string(),
            photo: None,
            reviews: Vec::new(),
            average_rating: 4.5,
        };
        let view = RankedStoreView::new(1, row);
        assert_eq!(view.average_rating, "4.5");
        assert_eq!(view.position, 1);
    }

    #[test]
    fn test_limit_parameter_is_clamped() {
        let default = TopQuery::default().stores_query();
        assert_eq!(default.limit(), 10);

        let huge = TopQuery {
            limit: Some(10_000),
            ..TopQuery::default()
        };
        assert_eq!(huge.stores_query().limit(), delicious_core::ranking::MAX_LIMIT);

        let three = TopQuery {
            limit: Some(3),
            ..TopQuery::default()
        };
        assert_eq!(three.stores_query().limit(), 3);
    }
}
