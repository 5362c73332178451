pub mod auth;

use axum::{
    Form, Json,
    extract::{Path, State, rejection::FormRejection},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use utoipa::OpenApi;

use std::sync::Arc;

use super::{AppState, LOGIN_URL, SUCCESS_URL};
use crate::{
    dto::{AuthFormResponse, FormErrors, NoteForm, NoteFormResponse, NoteResponse},
    guard::{self, Denial, Requester},
    service::NoteServiceError,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        home,
        list_notes,
        add_form,
        create_note,
        get_note,
        edit_form,
        update_note,
        delete_confirm,
        delete_note,
        success,
        auth::login_form,
        auth::login,
        auth::logout,
        auth::signup_form,
        auth::signup
    ),
    components(schemas(
        NoteResponse,
        NoteForm,
        NoteFormResponse,
        FormErrors,
        AuthFormResponse,
        crate::dto::LoginForm,
        crate::dto::SignupForm
    )),
    tags(
        (name = "notes", description = "Personal notes"),
        (name = "auth", description = "Signup, login and logout")
    )
)]
pub struct ApiDoc;

/// `302 Found` pointing at `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Characters of `next` escaped in the login URL. Slashes stay readable.
const NEXT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Sends an anonymous client to the login page, remembering where it was going.
pub fn login_redirect(uri: &Uri) -> Response {
    let next = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |path| path.as_str());
    found(&format!(
        "{LOGIN_URL}?next={}",
        utf8_percent_encode(next, NEXT_ESCAPE)
    ))
}

fn error_response(e: NoteServiceError, uri: &Uri, form: Option<NoteForm>) -> Response {
    match e {
        NoteServiceError::Denied(Denial::LoginRequired) => login_redirect(uri),
        NoteServiceError::Denied(Denial::NotFound) => {
            (StatusCode::NOT_FOUND, "Note not found").into_response()
        }
        NoteServiceError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            Json(NoteFormResponse {
                form: form.unwrap_or_default(),
                errors,
            }),
        )
            .into_response(),
        NoteServiceError::Repository(e) => {
            tracing::error!("note storage failure on {}: {}", uri.path(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Home page")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn home() -> Response {
    (StatusCode::OK, "Notes: keep your thoughts under your own slug").into_response()
}

#[utoipa::path(
    get,
    path = "/notes/",
    responses(
        (status = 200, description = "Notes owned by the requester", body = Vec<NoteResponse>),
        (status = 302, description = "Login required"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    uri: Uri,
) -> Response {
    match state.notes.list_notes(&requester).await {
        Ok(notes) => (StatusCode::OK, Json(notes)).into_response(),
        Err(e) => error_response(e, &uri, None),
    }
}

#[utoipa::path(
    get,
    path = "/add/",
    responses(
        (status = 200, description = "Empty note form", body = NoteFormResponse),
        (status = 302, description = "Login required")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn add_form(requester: Requester, uri: Uri) -> Response {
    if guard::require_login(&requester).is_err() {
        return login_redirect(&uri);
    }

    (
        StatusCode::OK,
        Json(NoteFormResponse {
            form: NoteForm::default(),
            errors: FormErrors::default(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/add/",
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Note created, or login required"),
        (status = 400, description = "Form errors", body = NoteFormResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    uri: Uri,
    form: Result<Form<NoteForm>, FormRejection>,
) -> Response {
    if guard::require_login(&requester).is_err() {
        return login_redirect(&uri);
    }
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };

    match state.notes.create_note(&requester, &form).await {
        Ok(_) => found(SUCCESS_URL),
        Err(e) => error_response(e, &uri, Some(form)),
    }
}

#[utoipa::path(
    get,
    path = "/note/{slug}/",
    params(
        ("slug" = String, Path, description = "Note slug")
    ),
    responses(
        (status = 200, description = "Note found", body = NoteResponse),
        (status = 302, description = "Login required"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    match state.notes.get_note(&requester, &slug).await {
        Ok(note) => (StatusCode::OK, Json(note)).into_response(),
        Err(e) => error_response(e, &uri, None),
    }
}

#[utoipa::path(
    get,
    path = "/edit/{slug}/",
    params(
        ("slug" = String, Path, description = "Note slug")
    ),
    responses(
        (status = 200, description = "Form filled with the note", body = NoteFormResponse),
        (status = 302, description = "Login required"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    match state.notes.edit_form(&requester, &slug).await {
        Ok(form) => (
            StatusCode::OK,
            Json(NoteFormResponse {
                form,
                errors: FormErrors::default(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e, &uri, None),
    }
}

#[utoipa::path(
    post,
    path = "/edit/{slug}/",
    params(
        ("slug" = String, Path, description = "Note slug")
    ),
    request_body(content = NoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Note updated, or login required"),
        (status = 400, description = "Form errors", body = NoteFormResponse),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    uri: Uri,
    Path(slug): Path<String>,
    form: Result<Form<NoteForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        // A body is only judged once the requester may edit the note at all.
        Err(rejection) => {
            return match state.notes.edit_form(&requester, &slug).await {
                Ok(_) => rejection.into_response(),
                Err(e) => error_response(e, &uri, None),
            };
        }
    };

    match state.notes.update_note(&requester, &slug, &form).await {
        Ok(_) => found(SUCCESS_URL),
        Err(e) => error_response(e, &uri, Some(form)),
    }
}

#[utoipa::path(
    get,
    path = "/delete/{slug}/",
    params(
        ("slug" = String, Path, description = "Note slug")
    ),
    responses(
        (status = 200, description = "Note awaiting confirmation", body = NoteResponse),
        (status = 302, description = "Login required"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    match state.notes.delete_preview(&requester, &slug).await {
        Ok(note) => (StatusCode::OK, Json(note)).into_response(),
        Err(e) => error_response(e, &uri, None),
    }
}

/// Serves both `POST` and `DELETE`; `GET` only renders the confirmation.
#[utoipa::path(
    post,
    path = "/delete/{slug}/",
    params(
        ("slug" = String, Path, description = "Note slug")
    ),
    responses(
        (status = 302, description = "Note deleted, or login required"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    uri: Uri,
    Path(slug): Path<String>,
) -> Response {
    match state.notes.delete_note(&requester, &slug).await {
        Ok(()) => found(SUCCESS_URL),
        Err(e) => error_response(e, &uri, None),
    }
}

#[utoipa::path(
    get,
    path = "/done/",
    responses(
        (status = 200, description = "Last change went through"),
        (status = 302, description = "Login required")
    ),
    tag = "notes"
)]
#[debug_handler(state = Arc<AppState>)]
pub async fn success(requester: Requester, uri: Uri) -> Response {
    if guard::require_login(&requester).is_err() {
        return login_redirect(&uri);
    }

    (StatusCode::OK, "Done!").into_response()
}
