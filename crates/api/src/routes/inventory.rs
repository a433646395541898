use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lumdash_db::models::{GearInventoryItem, InventoryReservation};
use lumdash_services::dao::gear_inventory::{InventoryChanges, NewInventoryItem};
use lumdash_services::reservation::{Availability, DayRange, ReconcileReport, format_day};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::table::notify_inventory;
use super::{rfc3339, stored_id};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ValidJson, parse_id},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInventoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub label: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub serial: Option<String>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub notes: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInventoryRequest {
    #[validate(length(min = 1, max = 200))]
    pub label: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    /// An empty string clears the serial.
    pub serial: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start: String,
    pub end: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReservationEntryResponse {
    pub reservation_id: Option<String>,
    pub manual_reservation_id: Option<String>,
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    pub check_out_date: String,
    pub check_in_date: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub id: String,
    pub label: String,
    pub brand: String,
    pub model: String,
    pub category: String,
    pub serial: Option<String>,
    pub quantity: u32,
    pub notes: Option<String>,
    pub reservations: Vec<ReservationEntryResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct AvailableItemResponse {
    #[serde(flatten)]
    pub item: InventoryResponse,
    pub availability: Availability,
}

fn entry_response(entry: InventoryReservation) -> ReservationEntryResponse {
    ReservationEntryResponse {
        reservation_id: entry.reservation_id.map(|id| id.to_hex()),
        manual_reservation_id: entry.manual_reservation_id.map(|id| id.to_hex()),
        event_id: entry.event_id.map(|id| id.to_hex()),
        user_id: entry.user_id.map(|id| id.to_hex()),
        check_out_date: format_day(entry.check_out_date),
        check_in_date: format_day(entry.check_in_date),
        quantity: entry.quantity,
    }
}

fn to_response(item: GearInventoryItem) -> Result<InventoryResponse, ApiError> {
    Ok(InventoryResponse {
        id: stored_id(item.id)?.to_hex(),
        label: item.label,
        brand: item.brand,
        model: item.model,
        category: item.category,
        serial: item.serial,
        quantity: item.quantity,
        notes: item.notes,
        reservations: item.reservations.into_iter().map(entry_response).collect(),
        created_at: rfc3339(item.created_at),
        updated_at: rfc3339(item.updated_at),
    })
}

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<InventoryResponse>>, ApiError> {
    let items = state.inventory.list(query.category.as_deref()).await?;
    let response = items
        .into_iter()
        .map(to_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(response))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let item = state
        .inventory
        .base
        .find_by_id(parse_id(&id, "inventory_id")?)
        .await?;
    Ok(Json(to_response(item)?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateInventoryRequest>,
) -> Result<(StatusCode, Json<InventoryResponse>), ApiError> {
    auth.require_admin()?;
    let item = state
        .inventory
        .create(NewInventoryItem {
            label: body.label.trim().to_string(),
            brand: body.brand.trim().to_string(),
            model: body.model.trim().to_string(),
            category: body.category.trim().to_string(),
            serial: body.serial,
            quantity: body.quantity,
            notes: body.notes,
        })
        .await?;

    notify_inventory(&state, item.id).await;
    Ok((StatusCode::CREATED, Json(to_response(item)?)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdateInventoryRequest>,
) -> Result<Json<InventoryResponse>, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&id, "inventory_id")?;
    let item = state
        .inventory
        .update(
            id,
            InventoryChanges {
                label: body.label.map(|s| s.trim().to_string()),
                brand: body.brand,
                model: body.model,
                category: body.category.map(|s| s.trim().to_string()),
                serial: body.serial.map(Some),
                quantity: body.quantity,
                notes: body.notes,
            },
        )
        .await?;

    notify_inventory(&state, Some(id)).await;
    Ok(Json(to_response(item)?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&id, "inventory_id")?;
    state.inventory.delete(id).await?;
    notify_inventory(&state, Some(id)).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn availability(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Availability>, ApiError> {
    let window = DayRange::parse(&query.start, &query.end)
        .map_err(|e| ApiError::invalid(&["start", "end"], e))?;
    let report = state
        .inventory
        .availability(parse_id(&id, "inventory_id")?, window)
        .await?;
    Ok(Json(report))
}

/// Items with at least one unit free on every day of the window.
pub async fn available(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<AvailableItemResponse>>, ApiError> {
    let window = DayRange::parse(&query.start, &query.end)
        .map_err(|e| ApiError::invalid(&["start", "end"], e))?;
    let items = state
        .inventory
        .list_available(window, query.category.as_deref())
        .await?;

    let response = items
        .into_iter()
        .map(|(item, availability)| {
            Ok(AvailableItemResponse {
                item: to_response(item)?,
                availability,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(Json(response))
}

pub async fn reconcile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ReconcileReport>, ApiError> {
    auth.require_admin()?;
    let report = state
        .inventory
        .reconcile(&state.reserved_gear, &state.manual_reservations, &state.tables)
        .await?;
    info!(requested_by = %auth.user_id, updated = report.items_updated, "Reconcile finished");

    if report.items_updated > 0 {
        notify_inventory(&state, None).await;
    }
    Ok(Json(report))
}
