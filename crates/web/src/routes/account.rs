//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::CurrentUser;
use crate::routes::{MessageQuery, redirect_with_error, redirect_with_success};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Account update form data.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
}

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
    pub name: String,
    pub email: String,
    pub member_since: String,
}

/// Display the account page.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;

    Ok(AccountTemplate {
        user: Some(current),
        error: query.error,
        success: query.success,
        title: "Edit Your Account".to_string(),
        name: user.name,
        email: user.email.into_inner(),
        member_since: user.created_at.format("%B %Y").to_string(),
    })
}

/// Handle the account form.
///
/// The session copy of the user is refreshed so the new name shows at once.
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<AccountForm>,
) -> Response {
    match AuthService::new(state.pool())
        .update_account(current.id, &form.name, &form.email)
        .await
    {
        Ok(user) => {
            let refreshed = CurrentUser::from(&user);
            if let Err(e) = set_current_user(&session, &refreshed).await {
                tracing::error!("Failed to refresh session: {}", e);
            }
            redirect_with_success("/account", "Updated the profile!")
        }
        Err(
            e @ (AuthError::MissingName | AuthError::InvalidEmail(_) | AuthError::UserAlreadyExists),
        ) => redirect_with_error("/account", &AppError::from(e).public_message()),
        Err(e) => AppError::from(e).into_response(),
    }
}
