use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use futures::SinkExt;
use tracing::info;

use super::auth::UserResponse;
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, parse_id},
    state::AppState,
    ws::{dispatcher, events::ChangeEvent},
};

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list().await?;
    let response = users
        .into_iter()
        .map(UserResponse::from_user)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(response))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;
    let user_id = parse_id(&user_id, "user_id")?;
    if user_id == auth.user_id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }

    state.users.delete(user_id).await?;
    info!(%user_id, deleted_by = %auth.user_id, "Deleted user");

    for sender in state.ws_storage.remove_user(&user_id) {
        let _ = sender.lock().await.close().await;
    }

    dispatcher::broadcast_all(
        &state.ws_storage,
        &ChangeEvent::UsersChanged {
            user_id: user_id.to_hex(),
        },
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
