use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use lumdash_db::models::ManualReservation;
use lumdash_services::dao::base::{PaginatedResult, PaginationParams};
use lumdash_services::dao::manual_reservation::{ManualReservationChanges, NewManualReservation};
use lumdash_services::reservation::{DayRange, parse_day};
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
pub struct CreateManualRequest {
    #[validate(length(min = 1, max = 200))]
    pub person_name: String,
    #[validate(email)]
    pub person_email: Option<String>,
    pub start_date: String,
    pub end_date: String,
    #[validate(length(min = 1))]
    pub inventory_id: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub notes: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateManualRequest {
    #[validate(length(min = 1, max = 200))]
    pub person_name: Option<String>,
    #[validate(email)]
    pub person_email: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub inventory_id: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ListQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ManualResponse {
    pub id: String,
    pub person_name: String,
    pub person_email: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub inventory_id: String,
    pub label: String,
    pub brand: String,
    pub model: String,
    pub category: String,
    pub quantity: u32,
    pub serial: Option<String>,
    pub created_by: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn to_response(record: ManualReservation) -> Result<ManualResponse, ApiError> {
    Ok(ManualResponse {
        id: stored_id(record.id)?.to_hex(),
        person_name: record.person_name,
        person_email: record.person_email,
        start_date: rfc3339(record.start_date),
        end_date: rfc3339(record.end_date),
        inventory_id: record.inventory_id.to_hex(),
        label: record.label,
        brand: record.brand,
        model: record.model,
        category: record.category,
        quantity: record.quantity,
        serial: record.serial,
        created_by: record.created_by.to_hex(),
        notes: record.notes,
        created_at: rfc3339(record.created_at),
        updated_at: rfc3339(record.updated_at),
    })
}

async fn load(state: &AppState, id: &str) -> Result<ManualReservation, ApiError> {
    Ok(state
        .manual_reservations
        .base
        .find_by_id(parse_id(id, "id")?)
        .await?)
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResult<ManualResponse>>, ApiError> {
    auth.require_admin()?;
    let inventory_id = query
        .inventory_id
        .as_deref()
        .map(|id| parse_id(id, "inventory_id"))
        .transpose()?;

    let page = state
        .manual_reservations
        .list(inventory_id, &query.pagination())
        .await?;

    Ok(Json(PaginatedResult {
        items: page
            .items
            .into_iter()
            .map(to_response)
            .collect::<Result<Vec<_>, _>>()?,
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ManualResponse>, ApiError> {
    auth.require_admin()?;
    Ok(Json(to_response(load(&state, &id).await?)?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateManualRequest>,
) -> Result<(StatusCode, Json<ManualResponse>), ApiError> {
    auth.require_admin()?;
    let window = DayRange::parse(&body.start_date, &body.end_date)
        .map_err(|e| ApiError::invalid(&["start_date", "end_date"], e))?;
    let inventory_id = parse_id(&body.inventory_id, "inventory_id")?;

    let record = state
        .manual_reservations
        .create(
            &state.inventory,
            auth.user_id,
            NewManualReservation {
                person_name: body.person_name,
                person_email: body.person_email,
                window,
                inventory_id,
                quantity: body.quantity,
                notes: body.notes,
            },
        )
        .await?;

    notify_inventory(&state, Some(inventory_id)).await;
    Ok((StatusCode::CREATED, Json(to_response(record)?)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdateManualRequest>,
) -> Result<Json<ManualResponse>, ApiError> {
    auth.require_admin()?;
    let existing = load(&state, &id).await?;

    // Either date may change alone; the other keeps its stored value.
    let window = match (body.start_date.as_deref(), body.end_date.as_deref()) {
        (None, None) => None,
        (start, end) => {
            let current = DayRange::from_stored(existing.start_date, existing.end_date);
            let start = start
                .map(parse_day)
                .transpose()
                .map_err(|e| ApiError::invalid(&["start_date"], e))?
                .unwrap_or(current.start);
            let end = end
                .map(parse_day)
                .transpose()
                .map_err(|e| ApiError::invalid(&["end_date"], e))?
                .unwrap_or(current.end);
            let window = DayRange::new(start, end)
                .map_err(|e| ApiError::invalid(&["start_date", "end_date"], e))?;
            Some(window)
        }
    };

    let record = state
        .manual_reservations
        .update(
            &state.inventory,
            &existing,
            ManualReservationChanges {
                person_name: body.person_name,
                person_email: body.person_email,
                window,
                quantity: body.quantity,
                notes: body.notes,
            },
        )
        .await?;

    notify_inventory(&state, Some(existing.inventory_id)).await;
    Ok(Json(to_response(record)?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;
    let existing = load(&state, &id).await?;
    let released = state
        .manual_reservations
        .delete(&state.inventory, &existing)
        .await?;
    info!(manual_id = %id, released, "Deleted manual reservation");

    notify_inventory(&state, Some(existing.inventory_id)).await;
    Ok(StatusCode::NO_CONTENT)
}
