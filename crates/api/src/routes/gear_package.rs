use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use lumdash_db::models::{GearPackage, PackageCategory, PackageItem};
use lumdash_services::dao::reserved_gear::NewReservedGear;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use super::reserved_gear::{ReservedGearResponse, notify_changed, to_response as item_response};
use super::table::load_table;
use super::{rfc3339, stored_id};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ValidJson, parse_id, table::TableId},
    state::AppState,
};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct PackageItemBody {
    pub inventory_id: Option<String>,
    #[validate(length(min = 1))]
    pub label: String,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1))]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct PackageCategoryBody {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<PackageItemBody>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePackageRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub categories: Vec<PackageCategoryBody>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePackageRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(nested)]
    pub categories: Option<Vec<PackageCategoryBody>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyPackageRequest {
    /// Overrides the category name as the gear list of every item.
    #[validate(length(min = 1, max = 100))]
    pub list_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PackageResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub categories: Vec<PackageCategoryBody>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyFailure {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub reserved: Vec<ReservedGearResponse>,
    pub failed: Vec<ApplyFailure>,
    /// Items without an inventory link cannot be reserved.
    pub skipped: Vec<String>,
}

fn to_response(package: GearPackage) -> Result<PackageResponse, ApiError> {
    Ok(PackageResponse {
        id: stored_id(package.id)?.to_hex(),
        user_id: package.user_id.to_hex(),
        name: package.name,
        description: package.description,
        categories: package
            .categories
            .into_iter()
            .map(|category| PackageCategoryBody {
                name: category.name,
                items: category
                    .items
                    .into_iter()
                    .map(|item| PackageItemBody {
                        inventory_id: item.inventory_id.map(|id| id.to_hex()),
                        label: item.label,
                        quantity: item.quantity,
                    })
                    .collect(),
            })
            .collect(),
        created_at: rfc3339(package.created_at),
        updated_at: rfc3339(package.updated_at),
    })
}

/// Trims `value`, which must keep some text. `field` names it in the error.
fn required_text(value: &str, field: impl FnOnce() -> String) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        let field = field();
        return Err(ApiError::invalid(&[field.as_str()], format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn to_categories(bodies: Vec<PackageCategoryBody>) -> Result<Vec<PackageCategory>, ApiError> {
    bodies
        .into_iter()
        .enumerate()
        .map(|(c, body)| {
            let name = required_text(&body.name, || format!("categories[{c}].name"))?;
            let items = body
                .items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let inventory_id = item
                        .inventory_id
                        .as_deref()
                        .filter(|id| !id.trim().is_empty())
                        .map(|id| parse_id(id, "inventory_id"))
                        .transpose()?;
                    Ok(PackageItem {
                        inventory_id,
                        label: required_text(&item.label, || {
                            format!("categories[{c}].items[{i}].label")
                        })?,
                        quantity: item.quantity,
                    })
                })
                .collect::<Result<Vec<_>, ApiError>>()?;
            Ok(PackageCategory { name, items })
        })
        .collect()
}

fn package_id(raw: &str) -> Result<ObjectId, ApiError> {
    parse_id(raw, "package_id")
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<PackageResponse>>, ApiError> {
    let packages = state.gear_packages.list_for_user(auth.user_id).await?;
    let response = packages
        .into_iter()
        .map(to_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(response))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PackageResponse>, ApiError> {
    let package = state
        .gear_packages
        .find_owned(package_id(&id)?, auth.user_id)
        .await?;
    Ok(Json(to_response(package)?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreatePackageRequest>,
) -> Result<(StatusCode, Json<PackageResponse>), ApiError> {
    let categories = to_categories(body.categories)?;
    let package = state
        .gear_packages
        .create(auth.user_id, body.name, body.description, categories)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(package)?)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdatePackageRequest>,
) -> Result<Json<PackageResponse>, ApiError> {
    let categories = body.categories.map(to_categories).transpose()?;
    let package = state
        .gear_packages
        .update(
            package_id(&id)?,
            auth.user_id,
            body.name,
            body.description,
            categories,
        )
        .await?;
    Ok(Json(to_response(package)?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .gear_packages
        .delete(package_id(&id)?, auth.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reserves every inventory-linked item of a package for the event. Each
/// item stands alone: a shortage on one does not undo the others.
pub async fn apply(
    State(state): State<AppState>,
    auth: AuthUser,
    TableId(table_id): TableId,
    Path((_, id)): Path<(String, String)>,
    ValidJson(body): ValidJson<ApplyPackageRequest>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let table = load_table(&state, &auth, table_id).await?;
    let package = state
        .gear_packages
        .find_owned(package_id(&id)?, auth.user_id)
        .await?;

    let mut response = ApplyResponse {
        reserved: Vec::new(),
        failed: Vec::new(),
        skipped: Vec::new(),
    };

    for category in package.categories {
        let list_name = body.list_name.clone().unwrap_or_else(|| category.name.clone());
        for item in category.items {
            let Some(inventory_id) = item.inventory_id else {
                response.skipped.push(item.label);
                continue;
            };

            let result = state
                .reserved_gear
                .reserve(
                    &state.inventory,
                    &table,
                    auth.user_id,
                    NewReservedGear {
                        inventory_id,
                        list_name: list_name.clone(),
                        quantity: item.quantity,
                        serial: None,
                        specific_serial_requested: false,
                    },
                )
                .await;

            match result {
                Ok(reserved) => {
                    notify_changed(&state, &table.audience(), &reserved).await;
                    response.reserved.push(item_response(reserved)?);
                }
                Err(e) => {
                    warn!(%table_id, %inventory_id, %e, "Package item not reserved");
                    response.failed.push(ApplyFailure {
                        label: item.label,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    info!(
        %table_id,
        reserved = response.reserved.len(),
        failed = response.failed.len(),
        "Applied gear package"
    );
    Ok(Json(response))
}
