use axum::{
    Json,
    extract::{Query, State},
};
use lumdash_services::chat::{ChatContext, ContextSection, build_context, system_prompt};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use super::table::load_table;
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ValidJson, table::TableId},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub sections: Vec<ContextSection>,
}

async fn assemble(
    state: &AppState,
    auth: &AuthUser,
    table_id: bson::oid::ObjectId,
    query: &str,
) -> Result<ChatContext, ApiError> {
    let table = load_table(state, auth, table_id).await?;
    let gear = state
        .reserved_gear
        .list_for_event(table_id, None, None)
        .await?;
    Ok(build_context(&table, &gear, query, &state.context_limits()))
}

/// The context the assistant would see for `q`.
pub async fn context(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    Query(query): Query<ContextQuery>,
) -> Result<Json<ChatContext>, ApiError> {
    Ok(Json(assemble(&state, &auth, table_id, &query.q).await?))
}

pub async fn ask(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    ValidJson(body): ValidJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if !state.assistant.is_available() {
        return Err(ApiError::ServiceUnavailable(
            "Chat assistant is not configured".to_string(),
        ));
    }

    let context = assemble(&state, &auth, table_id, &body.question).await?;
    debug!(%table_id, sections = ?context.sections, chars = context.text.len(), "Asking assistant");

    let answer = state
        .assistant
        .ask(&system_prompt(&context.text), &body.question)
        .await?;

    Ok(Json(AskResponse {
        answer,
        sections: context.sections,
    }))
}
