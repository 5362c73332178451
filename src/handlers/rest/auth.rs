use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use tower_sessions::Session;

use std::sync::Arc;

use super::found;
use crate::{
    auth::{AuthError, SESSION_USER_ID_KEY},
    dto::{AuthFormResponse, LoginForm, NextQuery, SignupForm},
    handlers::{AppState, LOGIN_URL},
};

/// Only same-site paths are followed after login. Browsers read `/\` like `//`.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && !next.chars().any(|c| c == '\\' || c.is_control()) =>
        {
            next
        }
        _ => "/",
    }
}

fn auth_error_response(e: AuthError, username: String) -> Response {
    match e {
        AuthError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            Json(AuthFormResponse { username, errors }),
        )
            .into_response(),
        other => {
            tracing::error!("authentication failure: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

fn session_failure(e: &tower_sessions::session::Error) -> Response {
    tracing::error!("session store failure: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

#[utoipa::path(
    get,
    path = "/auth/login/",
    responses(
        (status = 200, description = "Empty login form", body = AuthFormResponse)
    ),
    tag = "auth"
)]
#[debug_handler]
pub async fn login_form() -> Response {
    (StatusCode::OK, Json(AuthFormResponse::default())).into_response()
}

#[utoipa::path(
    post,
    path = "/auth/login/",
    params(NextQuery),
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Logged in, redirected to `next`"),
        (status = 400, description = "Wrong credentials", body = AuthFormResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state.users.login(&form).await {
        Ok(user) => user,
        Err(e) => return auth_error_response(e, form.username),
    };

    if let Err(e) = session.cycle_id().await {
        return session_failure(&e);
    }
    if let Err(e) = session.insert(SESSION_USER_ID_KEY, user.id).await {
        return session_failure(&e);
    }

    tracing::info!("User '{}' logged in", user.username);

    found(safe_next(query.next.as_deref()))
}

#[utoipa::path(
    post,
    path = "/auth/logout/",
    responses(
        (status = 200, description = "Session closed"),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[debug_handler]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = session.flush().await {
        return session_failure(&e);
    }

    (StatusCode::OK, "Logged out").into_response()
}

#[utoipa::path(
    get,
    path = "/auth/signup/",
    responses(
        (status = 200, description = "Empty signup form", body = AuthFormResponse)
    ),
    tag = "auth"
)]
#[debug_handler]
pub async fn signup_form() -> Response {
    (StatusCode::OK, Json(AuthFormResponse::default())).into_response()
}

#[utoipa::path(
    post,
    path = "/auth/signup/",
    request_body(content = SignupForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Account created, redirected to login"),
        (status = 400, description = "Form errors", body = AuthFormResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "auth"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn signup(State(state): State<Arc<AppState>>, Form(form): Form<SignupForm>) -> Response {
    match state.users.signup(&form).await {
        Ok(_) => found(LOGIN_URL),
        Err(e) => auth_error_response(e, form.username),
    }
}
