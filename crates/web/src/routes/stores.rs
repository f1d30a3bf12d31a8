//! Store listing, detail, and add/edit handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use delicious_core::{Pagination, STORE_TAGS, Store, StoreId, StoreInput};

use crate::db::{HeartRepository, StoreRepository};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::CurrentUser;
use crate::routes::{MessageQuery, redirect_with_error, redirect_with_success};
use crate::services::{CatalogError, CatalogService, PhotoUpload};
use crate::state::AppState;

/// Words of the description shown on a store card.
const EXCERPT_WORDS: usize = 25;

// =============================================================================
// View Types
// =============================================================================

/// Store display data for listing cards.
#[derive(Debug, Clone)]
pub struct StoreCard {
    pub id: StoreId,
    pub name: String,
    pub slug: String,
    pub excerpt: String,
    pub photo: Option<String>,
    pub hearted: bool,
    pub owned: bool,
}

impl StoreCard {
    pub fn new(store: &Store, user: Option<&CurrentUser>, hearts: &[StoreId]) -> Self {
        let excerpt = store
            .description
            .as_deref()
            .map(|d| d.split_whitespace().take(EXCERPT_WORDS).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        Self {
            id: store.id,
            name: store.name.clone(),
            slug: store.slug.clone(),
            excerpt,
            photo: store.photo.clone(),
            hearted: hearts.contains(&store.id),
            owned: user.is_some_and(|u| u.id == store.author),
        }
    }
}

/// Build cards for `stores`, loading the viewer's hearts when signed in.
pub(crate) async fn store_cards(
    state: &AppState,
    user: Option<&CurrentUser>,
    stores: &[Store],
) -> Result<Vec<StoreCard>> {
    let hearts = match user {
        Some(user) => HeartRepository::new(state.pool()).store_ids(user.id).await?,
        None => Vec::new(),
    };
    Ok(stores
        .iter()
        .map(|store| StoreCard::new(store, user, &hearts))
        .collect())
}

/// Previous/next links for the listing.
#[derive(Debug, Clone, Copy)]
pub struct PageLinks {
    pub page: u32,
    pub pages: u32,
    pub total: i64,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl From<Pagination> for PageLinks {
    fn from(p: Pagination) -> Self {
        Self {
            page: p.page,
            pages: p.pages,
            total: p.total,
            previous: p.has_previous().then(|| p.page - 1),
            next: p.has_next().then(|| p.page + 1),
        }
    }
}

/// A checkbox in the tag picker.
#[derive(Debug, Clone)]
pub struct TagOption {
    pub name: &'static str,
    pub checked: bool,
}

/// Values pre-filled in the add/edit form.
#[derive(Debug, Clone, Default)]
pub struct StoreFormView {
    pub action: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub longitude: String,
    pub latitude: String,
    pub photo: Option<String>,
    pub tags: Vec<TagOption>,
}

impl StoreFormView {
    fn blank() -> Self {
        Self {
            action: "/add".to_string(),
            tags: tag_options(&[]),
            ..Self::default()
        }
    }

    fn for_store(store: &Store) -> Self {
        let coordinates = store.location.coordinates;
        Self {
            action: format!("/add/{}", store.id),
            name: store.name.clone(),
            description: store.description.clone().unwrap_or_default(),
            address: store.location.address.clone(),
            longitude: coordinates.longitude().to_string(),
            latitude: coordinates.latitude().to_string(),
            photo: store.photo.clone(),
            tags: tag_options(&store.tags),
        }
    }
}

fn tag_options(selected: &[String]) -> Vec<TagOption> {
    STORE_TAGS
        .iter()
        .map(|&name| TagOption {
            name,
            checked: selected.iter().any(|t| t == name),
        })
        .collect()
}

/// A review as shown on the store page.
#[derive(Debug, Clone)]
pub struct ReviewView {
    pub author_name: String,
    pub text: String,
    pub stars: String,
    pub created: String,
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating);
    format!("{}{}", "★".repeat(filled), "☆".repeat(5usize.saturating_sub(filled)))
}

// =============================================================================
// Templates
// =============================================================================

/// Store listing template, shared by the index and hearts pages.
#[derive(Template, WebTemplate)]
#[template(path = "stores/index.html")]
pub struct StoresTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
    pub stores: Vec<StoreCard>,
    pub pagination: Option<PageLinks>,
}

/// Add/edit store form template.
#[derive(Template, WebTemplate)]
#[template(path = "stores/edit.html")]
pub struct EditStoreTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
    pub form: StoreFormView,
}

/// Store page template.
#[derive(Template, WebTemplate)]
#[template(path = "stores/show.html")]
pub struct ShowStoreTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
    pub card: StoreCard,
    pub description: String,
    pub address: String,
    pub tags: Vec<String>,
    pub reviews: Vec<ReviewView>,
}

// =============================================================================
// Listing
// =============================================================================

/// Query parameters for the listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Display one page of stores, newest first.
///
/// A page past the end redirects to the last page.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let repo = StoreRepository::new(state.pool());
    let requested = query.page.unwrap_or(1);
    let pagination = Pagination::new(requested, Pagination::DEFAULT_PER_PAGE, repo.count().await?);

    if pagination.is_past_end() {
        return Ok(redirect_with_error(
            &format!("/stores?page={}", pagination.pages),
            &format!(
                "You asked for page {requested}, which doesn't exist. Here is page {}.",
                pagination.pages
            ),
        ));
    }

    let stores = repo.list(&pagination).await?;
    let stores = store_cards(&state, user.as_ref(), &stores).await?;

    Ok(StoresTemplate {
        user,
        error: query.error,
        success: query.success,
        title: "Stores".to_string(),
        stores,
        pagination: Some(pagination.into()),
    }
    .into_response())
}

/// Display a store with its reviews.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let found = StoreRepository::new(state.pool())
        .get_by_slug(&slug, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store '{slug}'")))?;

    let mut cards = store_cards(&state, user.as_ref(), std::slice::from_ref(&found.store)).await?;
    let card = cards
        .pop()
        .ok_or_else(|| AppError::Internal("store card missing".to_string()))?;

    let reviews = found
        .reviews
        .unwrap_or_default()
        .into_iter()
        .map(|review| ReviewView {
            author_name: review.author_name,
            text: review.text,
            stars: stars(review.rating.get()),
            created: review.created.format("%B %-d, %Y").to_string(),
        })
        .collect();

    let store = found.store;
    Ok(ShowStoreTemplate {
        user,
        error: query.error,
        success: query.success,
        title: card.name.clone(),
        card,
        description: store.description.unwrap_or_default(),
        address: store.location.address,
        tags: store.tags,
        reviews,
    }
    .into_response())
}

// =============================================================================
// Add / Edit
// =============================================================================

/// Display the add store form.
pub async fn add_page(
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    EditStoreTemplate {
        user: Some(user),
        error: query.error,
        success: query.success,
        title: "Add Store".to_string(),
        form: StoreFormView::blank(),
    }
}

/// Display the edit form for a store the user owns.
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let store = CatalogService::new(state.pool(), state.photos())
        .store_for_edit(id, user.id)
        .await?;

    Ok(EditStoreTemplate {
        user: Some(user),
        error: query.error,
        success: query.success,
        title: format!("Edit {}", store.name),
        form: StoreFormView::for_store(&store),
    })
}

/// Handle the add store form.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let (input, photo) = read_store_form(multipart).await?;

    match CatalogService::new(state.pool(), state.photos())
        .create_store(user.id, input, photo)
        .await
    {
        Ok(store) => Ok(redirect_with_success(
            &format!("/store/{}", store.slug),
            &format!("Successfully created {}. Care to leave a review?", store.name),
        )),
        Err(e) => form_failure("/add", e),
    }
}

/// Handle the edit store form.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    multipart: Multipart,
) -> Result<Response> {
    let (input, photo) = read_store_form(multipart).await?;
    let edit_path = format!("/stores/{id}/edit");

    match CatalogService::new(state.pool(), state.photos())
        .update_store(id, user.id, input, photo)
        .await
    {
        Ok(store) => Ok(redirect_with_success(
            &edit_path,
            &format!("Successfully updated {}.", store.name),
        )),
        Err(e) => form_failure(&edit_path, e),
    }
}

/// Send input problems back to the form; everything else becomes an error page.
fn form_failure(form_path: &str, e: CatalogError) -> Result<Response> {
    let err = AppError::from(e);
    let input_problem = matches!(err, AppError::Validation(_) | AppError::Upload(_))
        && err.status().is_client_error();
    if input_problem {
        return Ok(redirect_with_error(form_path, &err.public_message()));
    }
    Err(err)
}

/// Read the multipart store form.
///
/// Coordinates that are missing or unparsable become NaN so validation
/// reports them. A file part with no filename or no bytes means no photo.
async fn read_store_form(
    mut multipart: Multipart,
) -> Result<(StoreInput, Option<PhotoUpload>)> {
    let mut input = StoreInput {
        longitude: f64::NAN,
        latitude: f64::NAN,
        ..StoreInput::default()
    };
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "photo" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let has_file = field.file_name().is_some_and(|f| !f.is_empty());
            let bytes = field.bytes().await.map_err(bad_form)?;
            if has_file && !bytes.is_empty() {
                photo = Some(PhotoUpload {
                    content_type,
                    bytes,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_form)?;
        match name.as_str() {
            "name" => input.name = value,
            "description" => input.description = Some(value),
            "tags" => input.tags.push(value),
            "address" => input.address = value,
            "lng" => input.longitude = parse_coordinate(&value),
            "lat" => input.latitude = parse_coordinate(&value),
            _ => {}
        }
    }

    Ok((input, photo))
}

fn parse_coordinate(value: &str) -> f64 {
    value.trim().parse().unwrap_or(f64::NAN)
}

#[allow(clippy::needless_pass_by_value)]
fn bad_form(e: MultipartError) -> AppError {
    AppError::Validation(e.body_text())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use delicious_core::{Coordinates, Location, UserId};

    use super::*;

    fn store(author: i32) -> Store {
        Store {
            id: StoreId::new(7),
            name: "Cafe Luna".to_string(),
            slug: "cafe-luna".to_string(),
            description: Some("one two three".to_string()),
            tags: vec!["Wifi".to_string()],
            created: Utc::now(),
            location: Location::point(Coordinates::new(-79.4, 43.6).unwrap(), "12 Main St"),
            photo: None,
            author: UserId::new(author),
        }
    }

    fn viewer(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            name: "Wes".to_string(),
            email: delicious_core::Email::parse("wes@example.com").unwrap(),
        }
    }

    #[test]
    fn test_card_marks_owner_and_hearts() {
        let me = viewer(1);
        let card = StoreCard::new(&store(1), Some(&me), &[StoreId::new(7)]);
        assert!(card.owned);
        assert!(card.hearted);

        let card = StoreCard::new(&store(2), Some(&me), &[]);
        assert!(!card.owned);
        assert!(!card.hearted);

        let card = StoreCard::new(&store(1), None, &[]);
        assert!(!card.owned);
    }

    #[test]
    fn test_excerpt_is_capped() {
        let mut long = store(1);
        long.description = Some("word ".repeat(40));
        let card = StoreCard::new(&long, None, &[]);
        assert_eq!(card.excerpt.split(' ').count(), EXCERPT_WORDS);
    }

    #[test]
    fn test_form_view_checks_store_tags() {
        let form = StoreFormView::for_store(&store(1));
        assert_eq!(form.action, "/add/7");
        let checked: Vec<_> = form.tags.iter().filter(|t| t.checked).map(|t| t.name).collect();
        assert_eq!(checked, ["Wifi"]);
        assert_eq!(form.tags.len(), STORE_TAGS.len());
    }

    #[test]
    fn test_page_links() {
        let links = PageLinks::from(Pagination::new(1, 6, 7));
        assert_eq!(links.previous, None);
        assert_eq!(links.next, Some(2));
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(3), "★★★☆☆");
        assert_eq!(stars(5), "★★★★★");
    }

    #[test]
    fn test_parse_coordinate() {
        assert!((parse_coordinate(" 43.5 ") - 43.5).abs() < f64::EPSILON);
        assert!(parse_coordinate("north").is_nan());
    }
}
