pub mod rest;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use crate::{auth::UserService, repository::Repository, service::NoteService};

pub const LOGIN_URL: &str = "/auth/login/";
pub const SUCCESS_URL: &str = "/done/";

pub struct AppState {
    pub notes: NoteService,
    pub users: UserService,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            notes: NoteService::new(repo.clone()),
            users: UserService::new(repo),
        }
    }
}

/// Route table for the whole application.
pub fn router(state: Arc<AppState>, secure_cookies: bool) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default()).with_secure(secure_cookies);

    Router::new()
        .route("/", get(rest::home))
        .route("/notes/", get(rest::list_notes))
        .route("/add/", get(rest::add_form).post(rest::create_note))
        .route("/note/{slug}/", get(rest::get_note))
        .route("/edit/{slug}/", get(rest::edit_form).post(rest::update_note))
        .route(
            "/delete/{slug}/",
            get(rest::delete_confirm)
                .post(rest::delete_note)
                .delete(rest::delete_note),
        )
        .route(SUCCESS_URL, get(rest::success))
        .route(
            LOGIN_URL,
            get(rest::auth::login_form).post(rest::auth::login),
        )
        .route("/auth/logout/", post(rest::auth::logout))
        .route(
            "/auth/signup/",
            get(rest::auth::signup_form).post(rest::auth::signup),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", rest::ApiDoc::openapi()))
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
