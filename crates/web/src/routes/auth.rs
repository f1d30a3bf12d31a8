//! Authentication route handlers: login, registration, logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::{MessageQuery, redirect_with_error, redirect_with_success};
use crate::services::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub error: Option<String>,
    pub success: Option<String>,
    pub title: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        user,
        error: query.error,
        success: query.success,
        title: "Login".to_string(),
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => start_session(&session, &user, "/", "You are now logged in!").await,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed: invalid credentials");
            redirect_with_error("/login", "Invalid email or password")
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        user,
        error: query.error,
        success: query.success,
        title: "Register".to_string(),
    }
}

/// Handle registration form submission.
///
/// A successful registration logs the new user in.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = Registration {
        name: &form.name,
        email: &form.email,
        password: &form.password,
        confirm: &form.password_confirm,
    };

    match AuthService::new(state.pool()).register(registration).await {
        Ok(user) => start_session(&session, &user, "/", "Welcome! Your account is ready.").await,
        Err(
            e @ (AuthError::MissingName
            | AuthError::InvalidEmail(_)
            | AuthError::WeakPassword(_)
            | AuthError::PasswordMismatch
            | AuthError::UserAlreadyExists),
        ) => {
            let message = AppError::from(e).public_message();
            redirect_with_error("/register", &message)
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Put `user` in the session and continue to `next`.
async fn start_session(session: &Session, user: &User, next: &str, message: &str) -> Response {
    if let Err(e) = set_current_user(session, &CurrentUser::from(user)).await {
        tracing::error!("Failed to set session: {}", e);
        return redirect_with_error("/login", "Could not start your session, please try again");
    }
    set_sentry_user(&user.id, Some(user.email.as_str()));
    redirect_with_success(next, message)
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();
    Redirect::to("/?success=You+are+now+logged+out").into_response()
}
