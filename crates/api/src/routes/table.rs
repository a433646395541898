use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use bson::oid::ObjectId;
use lumdash_db::models::{
    CardLogEntry, CrewRow, EventGeneral, EventTask, GearConfig, ProgramDay, Shotlist, Table,
    TravelEntry,
};
use lumdash_services::dao::base::DaoError;
use lumdash_services::dao::table::TableSection;
use lumdash_services::reservation::{DayRange, event_window, format_day, parse_day};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{rfc3339, stored_id};
use crate::{
    error::ApiError,
    extractors::{
        auth::AuthUser,
        json::{JsonBody, ValidJson},
        parse_id,
        table::TableId,
    },
    state::AppState,
    ws::{dispatcher, events::ChangeEvent},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTableRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub general: EventGeneral,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTableRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub general: Option<EventGeneral>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShareRequest {
    pub user_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GearRequest {
    pub check_out_date: Option<String>,
    pub check_in_date: Option<String>,
    pub lists: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct GearResponse {
    pub check_out_date: Option<String>,
    pub check_in_date: Option<String>,
    pub lists: Vec<String>,
}

impl From<&GearConfig> for GearResponse {
    fn from(gear: &GearConfig) -> Self {
        Self {
            check_out_date: gear.check_out_date.map(format_day),
            check_in_date: gear.check_in_date.map(format_day),
            lists: gear.lists.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GearUpdateResponse {
    pub gear: GearResponse,
    pub reservations_synced: u64,
}

#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub id: String,
    pub title: String,
    pub owners: Vec<String>,
    pub shared_with: Vec<String>,
    pub general: EventGeneral,
    pub program_schedule: Vec<ProgramDay>,
    pub rows: Vec<CrewRow>,
    pub tasks: Vec<EventTask>,
    pub travel: Vec<TravelEntry>,
    pub gear: GearResponse,
    pub card_log: Vec<CardLogEntry>,
    pub shotlists: Vec<Shotlist>,
    pub created_at: String,
    pub updated_at: String,
}

fn to_response(table: Table) -> Result<TableResponse, ApiError> {
    Ok(TableResponse {
        id: stored_id(table.id)?.to_hex(),
        title: table.title,
        owners: table.owners.iter().map(|id| id.to_hex()).collect(),
        shared_with: table.shared_with.iter().map(|id| id.to_hex()).collect(),
        gear: GearResponse::from(&table.gear),
        general: table.general,
        program_schedule: table.program_schedule,
        rows: table.rows,
        tasks: table.tasks,
        travel: table.travel,
        card_log: table.card_log,
        shotlists: table.shotlists,
        created_at: rfc3339(table.created_at),
        updated_at: rfc3339(table.updated_at),
    })
}

/// Loads an event the caller may read and edit.
pub(crate) async fn load_table(
    state: &AppState,
    auth: &AuthUser,
    table_id: ObjectId,
) -> Result<Table, ApiError> {
    Ok(state
        .tables
        .find_accessible(table_id, auth.user_id, auth.is_admin())
        .await?)
}

fn require_owner(table: &Table, auth: &AuthUser) -> Result<(), ApiError> {
    if auth.is_admin() || table.is_owner(auth.user_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only an owner can do this".to_string()))
    }
}

/// Normalizes general start/end to `YYYY-MM-DD` and checks their order.
fn normalize_general(mut general: EventGeneral) -> Result<EventGeneral, ApiError> {
    let start = general.start.as_deref().filter(|s| !s.trim().is_empty());
    let end = general.end.as_deref().filter(|s| !s.trim().is_empty());

    let start = start
        .map(parse_day)
        .transpose()
        .map_err(|e| ApiError::invalid(&["general.start"], e))?;
    let end = end
        .map(parse_day)
        .transpose()
        .map_err(|e| ApiError::invalid(&["general.end"], e))?;
    if let (Some(start), Some(end)) = (start, end) {
        DayRange::new(start, end)
            .map_err(|e| ApiError::invalid(&["general.start", "general.end"], e))?;
    }

    general.start = start.map(|d| d.format("%Y-%m-%d").to_string());
    general.end = end.map(|d| d.format("%Y-%m-%d").to_string());
    Ok(general)
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<TableResponse>>, ApiError> {
    let tables = state
        .tables
        .list_for_user(auth.user_id, auth.is_admin())
        .await?;
    let response = tables
        .into_iter()
        .map(to_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(response))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateTableRequest>,
) -> Result<(StatusCode, Json<TableResponse>), ApiError> {
    let general = normalize_general(body.general)?;
    let table = state.tables.create(auth.user_id, body.title, general).await?;
    info!(table_id = ?table.id, owner = %auth.user_id, "Created event");
    Ok((StatusCode::CREATED, Json(to_response(table)?)))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<TableResponse>, ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    Ok(Json(to_response(table)?))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    ValidJson(body): ValidJson<UpdateTableRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    let before = load_table(&state, &auth, table_id).await?;
    let general = body.general.map(normalize_general).transpose()?;

    // Without explicit gear dates the reservations follow the general dates.
    let mut moved_to = None;
    if let (Some(general), None) = (&general, before.gear.check_out_date) {
        let mut candidate = before.clone();
        candidate.general = general.clone();
        moved_to = event_window(&candidate)
            .ok()
            .filter(|window| event_window(&before).ok() != Some(*window));
    }
    if let Some(window) = moved_to {
        state.inventory.check_move(table_id, window).await?;
    }

    let table = state
        .tables
        .update_general(table_id, body.title, general)
        .await?;

    if let Some(window) = moved_to {
        let synced = state.inventory.sync_event_dates(table_id, window).await?;
        if synced > 0 {
            notify_inventory(&state, None).await;
        }
    }

    dispatcher::broadcast(
        &state.ws_storage,
        &table.audience(),
        &ChangeEvent::TableUpdated {
            table_id: table_id.to_hex(),
            title: table.title.clone(),
        },
    )
    .await;

    Ok(Json(to_response(table)?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<StatusCode, ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    require_owner(&table, &auth)?;

    let removed_items = state.reserved_gear.remove_for_event(table_id).await?;
    let released = state.inventory.release_event(table_id).await?;
    state.tables.delete(table_id).await?;
    info!(%table_id, removed_items, released, "Deleted event");

    dispatcher::broadcast(
        &state.ws_storage,
        &table.audience(),
        &ChangeEvent::TableDeleted {
            table_id: table_id.to_hex(),
        },
    )
    .await;
    if released > 0 {
        notify_inventory(&state, None).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn share(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    ValidJson(body): ValidJson<ShareRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    let before = load_table(&state, &auth, table_id).await?;
    require_owner(&before, &auth)?;

    let mut user_ids: Vec<ObjectId> = Vec::new();
    for raw in &body.user_ids {
        let user_id = parse_id(raw, "user_ids")?;
        match state.users.base.find_by_id(user_id).await {
            Ok(_) => {}
            Err(DaoError::NotFound) => {
                return Err(ApiError::invalid(&["user_ids"], format!("Unknown user {raw}")));
            }
            Err(e) => return Err(e.into()),
        }
        if !before.is_owner(user_id) && !user_ids.contains(&user_id) {
            user_ids.push(user_id);
        }
    }

    let table = state.tables.set_shared_with(table_id, user_ids).await?;

    let mut audience = before.audience();
    for id in table.audience() {
        if !audience.contains(&id) {
            audience.push(id);
        }
    }
    dispatcher::broadcast(
        &state.ws_storage,
        &audience,
        &ChangeEvent::TableUpdated {
            table_id: table_id.to_hex(),
            title: table.title.clone(),
        },
    )
    .await;

    Ok(Json(to_response(table)?))
}

/// Sub-collection items that get an id on save when the client sent none.
trait SectionItem: Serialize + DeserializeOwned {
    fn prepare(&mut self) -> Result<(), ApiError>;
}

fn ensure_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

impl SectionItem for ProgramDay {
    fn prepare(&mut self) -> Result<(), ApiError> {
        self.date = parse_day(&self.date)
            .map_err(|e| ApiError::invalid(&["date"], e))?
            .format("%Y-%m-%d")
            .to_string();
        for program in &mut self.programs {
            ensure_id(&mut program.id);
        }
        Ok(())
    }
}

impl SectionItem for CrewRow {
    fn prepare(&mut self) -> Result<(), ApiError> {
        ensure_id(&mut self.id);
        Ok(())
    }
}

impl SectionItem for EventTask {
    fn prepare(&mut self) -> Result<(), ApiError> {
        ensure_id(&mut self.id);
        Ok(())
    }
}

impl SectionItem for TravelEntry {
    fn prepare(&mut self) -> Result<(), ApiError> {
        ensure_id(&mut self.id);
        Ok(())
    }
}

impl SectionItem for CardLogEntry {
    fn prepare(&mut self) -> Result<(), ApiError> {
        ensure_id(&mut self.id);
        Ok(())
    }
}

impl SectionItem for Shotlist {
    fn prepare(&mut self) -> Result<(), ApiError> {
        ensure_id(&mut self.id);
        for item in &mut self.items {
            ensure_id(&mut item.id);
        }
        Ok(())
    }
}

async fn replace_section<T: SectionItem>(
    state: &AppState,
    auth: &AuthUser,
    table_id: ObjectId,
    section: TableSection,
    mut items: Vec<T>,
) -> Result<Json<Vec<T>>, ApiError> {
    let table = load_table(state, auth, table_id).await?;
    for item in &mut items {
        item.prepare()?;
    }

    state.tables.replace_section(table_id, section, &items).await?;

    let payload = serde_json::to_value(&items).map_err(|e| ApiError::Internal(e.to_string()))?;
    dispatcher::broadcast(
        &state.ws_storage,
        &table.audience(),
        &ChangeEvent::section(section, table_id.to_hex(), payload),
    )
    .await;

    Ok(Json(items))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<Vec<ProgramDay>>, ApiError> {
    Ok(Json(load_table(&state, &auth, table_id).await?.program_schedule))
}

pub async fn put_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    JsonBody(items): JsonBody<Vec<ProgramDay>>,
) -> Result<Json<Vec<ProgramDay>>, ApiError> {
    replace_section(&state, &auth, table_id, TableSection::Schedule, items).await
}

pub async fn get_crew(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<Vec<CrewRow>>, ApiError> {
    Ok(Json(load_table(&state, &auth, table_id).await?.rows))
}

pub async fn put_crew(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    JsonBody(items): JsonBody<Vec<CrewRow>>,
) -> Result<Json<Vec<CrewRow>>, ApiError> {
    replace_section(&state, &auth, table_id, TableSection::Crew, items).await
}

pub async fn get_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<Vec<EventTask>>, ApiError> {
    Ok(Json(load_table(&state, &auth, table_id).await?.tasks))
}

pub async fn put_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    JsonBody(items): JsonBody<Vec<EventTask>>,
) -> Result<Json<Vec<EventTask>>, ApiError> {
    replace_section(&state, &auth, table_id, TableSection::Tasks, items).await
}

pub async fn get_travel(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<Vec<TravelEntry>>, ApiError> {
    Ok(Json(load_table(&state, &auth, table_id).await?.travel))
}

pub async fn put_travel(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    JsonBody(items): JsonBody<Vec<TravelEntry>>,
) -> Result<Json<Vec<TravelEntry>>, ApiError> {
    replace_section(&state, &auth, table_id, TableSection::Travel, items).await
}

pub async fn get_card_log(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<Vec<CardLogEntry>>, ApiError> {
    Ok(Json(load_table(&state, &auth, table_id).await?.card_log))
}

pub async fn put_card_log(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    JsonBody(items): JsonBody<Vec<CardLogEntry>>,
) -> Result<Json<Vec<CardLogEntry>>, ApiError> {
    replace_section(&state, &auth, table_id, TableSection::CardLog, items).await
}

pub async fn get_shotlists(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<Vec<Shotlist>>, ApiError> {
    Ok(Json(load_table(&state, &auth, table_id).await?.shotlists))
}

pub async fn put_shotlists(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    JsonBody(items): JsonBody<Vec<Shotlist>>,
) -> Result<Json<Vec<Shotlist>>, ApiError> {
    replace_section(&state, &auth, table_id, TableSection::Shotlists, items).await
}

pub async fn get_gear(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
) -> Result<Json<GearResponse>, ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    Ok(Json(GearResponse::from(&table.gear)))
}

/// Sets the gear window and list names. A changed window moves every
/// inventory reservation of the event along with it.
pub async fn put_gear(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    ValidJson(body): ValidJson<GearRequest>,
) -> Result<Json<GearUpdateResponse>, ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    let previous_window = event_window(&table).ok();

    let mut gear = table.gear.clone();
    match (body.check_out_date.as_deref(), body.check_in_date.as_deref()) {
        (Some(out), Some(back)) => {
            let window = DayRange::parse(out, back)
                .map_err(|e| ApiError::invalid(&["check_out_date", "check_in_date"], e))?;
            gear.check_out_date = Some(window.stored_start());
            gear.check_in_date = Some(window.stored_end());
        }
        (None, None) => {}
        _ => {
            return Err(ApiError::invalid(
                &["check_out_date", "check_in_date"],
                "check_out_date and check_in_date must be set together",
            ));
        }
    }
    if let Some(lists) = body.lists {
        let mut names: Vec<String> = Vec::new();
        for name in lists.into_iter().map(|n| n.trim().to_string()) {
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        gear.lists = names;
    }

    let mut candidate = table.clone();
    candidate.gear = gear.clone();
    let moved_to = event_window(&candidate)
        .ok()
        .filter(|window| previous_window != Some(*window));
    if let Some(window) = moved_to {
        state.inventory.check_move(table_id, window).await?;
    }

    let updated = state.tables.set_gear(table_id, &gear).await?;

    let mut reservations_synced = 0;
    if let Some(window) = moved_to {
        reservations_synced = state.inventory.sync_event_dates(table_id, window).await?;
    }

    let response = GearResponse::from(&updated.gear);
    let payload = serde_json::to_value(&response).map_err(|e| ApiError::Internal(e.to_string()))?;
    dispatcher::broadcast(
        &state.ws_storage,
        &updated.audience(),
        &ChangeEvent::GearChanged {
            table_id: table_id.to_hex(),
            gear: payload,
        },
    )
    .await;
    if reservations_synced > 0 {
        notify_inventory(&state, None).await;
    }

    Ok(Json(GearUpdateResponse {
        gear: response,
        reservations_synced,
    }))
}

pub(crate) async fn notify_inventory(state: &AppState, inventory_id: Option<ObjectId>) {
    dispatcher::broadcast_all(
        &state.ws_storage,
        &ChangeEvent::InventoryChanged {
            inventory_id: inventory_id.map(|id| id.to_hex()),
        },
    )
    .await;
}
