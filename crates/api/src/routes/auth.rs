use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use lumdash_db::models::{User, UserRole};
use lumdash_services::auth::TokenPair;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::{rfc3339, stored_id};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ValidJson},
    state::AppState,
    ws::{dispatcher, events::ChangeEvent},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: User) -> Result<Self, ApiError> {
        Ok(Self {
            id: stored_id(user.id)?.to_hex(),
            email: user.email,
            username: user.username,
            display_name: user.display_name,
            role: user.role,
            created_at: rfc3339(user.created_at),
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    let password_hash = state.auth.hash_password(&body.password)?;
    let role = if state.is_admin_email(&body.email) {
        UserRole::Admin
    } else {
        UserRole::Member
    };

    let user = state
        .users
        .create(
            body.email,
            body.username.trim().to_string(),
            body.display_name.trim().to_string(),
            password_hash,
            role,
        )
        .await?;

    let user_id = stored_id(user.id)?;
    info!(%user_id, ?role, "Registered user");

    let tokens = state
        .auth
        .generate_tokens(user_id, &user.email, &user.username, user.role)?;
    let headers = session_cookie(&tokens)?;

    dispatcher::broadcast_all(
        &state.ws_storage,
        &ChangeEvent::UsersChanged {
            user_id: user_id.to_hex(),
        },
    )
    .await;

    let response = AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserResponse::from_user(user)?,
    };

    Ok((StatusCode::CREATED, headers, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let user = if let Some(ref email) = body.email {
        state.users.find_by_email(email).await
    } else if let Some(ref username) = body.username {
        state.users.find_by_username(username).await
    } else {
        return Err(ApiError::BadRequest("Either username or email is required".to_string()));
    }
    .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = stored_id(user.id)?;
    let tokens = state
        .auth
        .generate_tokens(user_id, &user.email, &user.username, user.role)?;
    let headers = session_cookie(&tokens)?;

    let response = AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: UserResponse::from_user(user)?,
    };

    Ok((headers, Json(response)))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(UserResponse::from_user(user)?))
}

fn session_cookie(tokens: &TokenPair) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        tokens.access_token, tokens.expires_in
    );
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("Invalid cookie header: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}
