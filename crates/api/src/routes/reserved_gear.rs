use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lumdash_db::models::ReservedGearItem;
use lumdash_services::dao::reserved_gear::{NewReservedGear, ReservedGearChanges};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::table::{load_table, notify_inventory};
use super::{rfc3339, stored_id};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ValidJson, parse_id, table::TableId},
    state::AppState,
    ws::{dispatcher, events::ChangeEvent},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReservedGearRequest {
    #[validate(length(min = 1))]
    pub inventory_id: String,
    #[validate(length(min = 1, max = 100))]
    pub list_name: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub serial: Option<String>,
    #[serde(default)]
    pub specific_serial_requested: bool,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReservedGearRequest {
    #[validate(length(min = 1, max = 100))]
    pub list_name: Option<String>,
    pub is_packed: Option<bool>,
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub list_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReservedGearResponse {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub list_name: String,
    pub inventory_id: String,
    pub label: String,
    pub brand: String,
    pub model: String,
    pub category: String,
    pub quantity: u32,
    pub serial: Option<String>,
    pub specific_serial_requested: bool,
    pub is_packed: bool,
    pub packed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) fn to_response(item: ReservedGearItem) -> Result<ReservedGearResponse, ApiError> {
    Ok(ReservedGearResponse {
        id: stored_id(item.id)?.to_hex(),
        event_id: item.event_id.to_hex(),
        user_id: item.user_id.to_hex(),
        list_name: item.list_name,
        inventory_id: item.inventory_id.to_hex(),
        label: item.label,
        brand: item.brand,
        model: item.model,
        category: item.category,
        quantity: item.quantity,
        serial: item.serial,
        specific_serial_requested: item.specific_serial_requested,
        is_packed: item.is_packed,
        packed_at: item.packed_at.map(rfc3339),
        created_at: rfc3339(item.created_at),
        updated_at: rfc3339(item.updated_at),
    })
}

fn to_responses(items: Vec<ReservedGearItem>) -> Result<Vec<ReservedGearResponse>, ApiError> {
    items.into_iter().map(to_response).collect()
}

pub(crate) async fn notify_changed(state: &AppState, audience: &[bson::oid::ObjectId], item: &ReservedGearItem) {
    dispatcher::broadcast(
        &state.ws_storage,
        audience,
        &ChangeEvent::ReservedGearChanged {
            table_id: item.event_id.to_hex(),
            item_id: item.id.map(|id| id.to_hex()).unwrap_or_default(),
            inventory_id: item.inventory_id.to_hex(),
        },
    )
    .await;
    notify_inventory(state, Some(item.inventory_id)).await;
}

/// The caller's reserved items for one event.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ReservedGearResponse>>, ApiError> {
    load_table(&state, &auth, table_id).await?;
    let items = state
        .reserved_gear
        .list_for_event(table_id, Some(auth.user_id), query.list_name.as_deref())
        .await?;
    Ok(Json(to_responses(items)?))
}

/// The caller's reserved items across every event.
pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ReservedGearResponse>>, ApiError> {
    let items = state.reserved_gear.list_for_user(auth.user_id).await?;
    Ok(Json(to_responses(items)?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    ValidJson(body): ValidJson<CreateReservedGearRequest>,
) -> Result<(StatusCode, Json<ReservedGearResponse>), ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    let inventory_id = parse_id(&body.inventory_id, "inventory_id")?;

    let item = state
        .reserved_gear
        .reserve(
            &state.inventory,
            &table,
            auth.user_id,
            NewReservedGear {
                inventory_id,
                list_name: body.list_name,
                quantity: body.quantity,
                serial: body.serial,
                specific_serial_requested: body.specific_serial_requested,
            },
        )
        .await?;

    notify_changed(&state, &table.audience(), &item).await;
    Ok((StatusCode::CREATED, Json(to_response(item)?)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    Path((_, item_id)): Path<(String, String)>,
    ValidJson(body): ValidJson<UpdateReservedGearRequest>,
) -> Result<Json<ReservedGearResponse>, ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    let item_id = parse_id(&item_id, "item_id")?;
    let existing = state
        .reserved_gear
        .find_owned(item_id, table_id, auth.user_id)
        .await?;

    let item = state
        .reserved_gear
        .update(
            &state.inventory,
            &table,
            &existing,
            ReservedGearChanges {
                list_name: body.list_name,
                is_packed: body.is_packed,
                quantity: body.quantity,
            },
        )
        .await?;

    notify_changed(&state, &table.audience(), &item).await;
    Ok(Json(to_response(item)?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    Path((_, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    let item_id = parse_id(&item_id, "item_id")?;
    let existing = state
        .reserved_gear
        .find_owned(item_id, table_id, auth.user_id)
        .await?;

    let released = state.reserved_gear.remove(&state.inventory, &existing).await?;
    info!(%item_id, released, "Removed reserved gear");

    notify_changed(&state, &table.audience(), &existing).await;
    Ok(StatusCode::NO_CONTENT)
}
