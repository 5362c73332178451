use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use std::sync::Arc;

use crate::{guard::Requester, handlers::AppState};

/// Session key holding the logged-in user's id.
pub const SESSION_USER_ID_KEY: &str = "_auth_user_id";

impl FromRequestParts<Arc<AppState>> for Requester {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let user_id = session
            .get::<i64>(SESSION_USER_ID_KEY)
            .await
            .map_err(|e| {
                tracing::error!("failed to read session: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })?;

        state.users.requester(user_id).await.map_err(|e| {
            tracing::error!("failed to load session user: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
    }
}
