//! Tag browser handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};

use crate::db::StoreRepository;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::routes::stores::{StoreCard, store_cards};
use crate::state::AppState;

/// A tag in the browser, with its store count.
#[derive(Debug, Clone)]
pub struct TagLink {
    pub name: String,
    pub count: i64,
    pub active: bool,
}

/// Tag browser template.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
    pub tags: Vec<TagLink>,
    pub stores: Vec<StoreCard>,
}

/// Display every tag and every tagged store.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<TagsTemplate> {
    render(&state, user, None).await
}

/// Display every tag and the stores carrying one of them.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(tag): Path<String>,
) -> Result<TagsTemplate> {
    render(&state, user, Some(tag)).await
}

async fn render(
    state: &AppState,
    user: Option<CurrentUser>,
    selected: Option<String>,
) -> Result<TagsTemplate> {
    let repo = StoreRepository::new(state.pool());
    let (counts, stores) = tokio::try_join!(repo.tag_counts(), repo.by_tag(selected.as_deref()))?;

    let tags = counts
        .into_iter()
        .map(|tc| TagLink {
            active: selected.as_deref() == Some(tc.tag.as_str()),
            name: tc.tag,
            count: tc.count,
        })
        .collect();
    let stores = store_cards(state, user.as_ref(), &stores).await?;

    Ok(TagsTemplate {
        user,
        error: None,
        success: None,
        title: selected.unwrap_or_else(|| "Tags".to_string()),
        tags,
        stores,
    })
}
