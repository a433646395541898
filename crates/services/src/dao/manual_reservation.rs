use bson::{doc, oid::ObjectId, DateTime, Document};
use lumdash_db::models::{InventoryReservation, ManualReservation};
use mongodb::Database;
use tracing::{error, info};

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
use super::gear_inventory::GearInventoryDao;
use crate::reservation::DayRange;

pub struct ManualReservationDao {
    pub base: BaseDao<ManualReservation>,
}

#[derive(Debug, Clone)]
pub struct NewManualReservation {
    pub person_name: String,
    pub person_email: Option<String>,
    pub window: DayRange,
    pub inventory_id: ObjectId,
    pub quantity: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ManualReservationChanges {
    pub person_name: Option<String>,
    pub person_email: Option<String>,
    pub window: Option<DayRange>,
    pub quantity: Option<u32>,
    pub notes: Option<String>,
}

impl ManualReservationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, ManualReservation::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        inventory: &GearInventoryDao,
        created_by: ObjectId,
        request: NewManualReservation,
    ) -> DaoResult<ManualReservation> {
        let person_name = request.person_name.trim().to_string();
        if person_name.is_empty() {
            return Err(DaoError::invalid(&["person_name"], "person_name is required"));
        }
        if request.quantity == 0 {
            return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
        }

        let item = inventory.base.find_by_id(request.inventory_id).await?;
        let id = ObjectId::new();
        let now = DateTime::now();

        inventory
            .reserve(request.inventory_id, manual_entry(id, request.window, request.quantity))
            .await?;

        let record = ManualReservation {
            id: Some(id),
            person_name,
            person_email: request.person_email,
            start_date: request.window.stored_start(),
            end_date: request.window.stored_end(),
            inventory_id: request.inventory_id,
            label: item.label,
            brand: item.brand,
            model: item.model,
            category: item.category,
            quantity: request.quantity,
            serial: item.serial,
            created_by,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.base.insert_one(&record).await {
            error!(manual_id = %id, %e, "Failed to record manual reservation, releasing inventory");
            if let Err(release_err) = inventory.release_manual(request.inventory_id, id).await {
                error!(manual_id = %id, %release_err, "Compensating release failed");
            }
            return Err(e);
        }

        info!(manual_id = %id, inventory_id = %request.inventory_id, "Created manual reservation");
        self.base.find_by_id(id).await
    }

    pub async fn list(
        &self,
        inventory_id: Option<ObjectId>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<ManualReservation>> {
        let filter = match inventory_id {
            Some(id) => doc! { "inventory_id": id },
            None => doc! {},
        };
        self.base
            .find_paginated(filter, Some(doc! { "start_date": -1 }), params)
            .await
    }

    pub async fn update(
        &self,
        inventory: &GearInventoryDao,
        existing: &ManualReservation,
        changes: ManualReservationChanges,
    ) -> DaoResult<ManualReservation> {
        let id = existing.id.ok_or(DaoError::NotFound)?;
        let mut set = Document::new();

        if let Some(name) = changes.person_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DaoError::invalid(&["person_name"], "person_name is required"));
            }
            set.insert("person_name", name);
        }
        if let Some(email) = changes.person_email {
            set.insert("person_email", email);
        }
        if let Some(notes) = changes.notes {
            set.insert("notes", notes);
        }

        let window = changes
            .window
            .unwrap_or_else(|| DayRange::from_stored(existing.start_date, existing.end_date));
        let quantity = changes.quantity.unwrap_or(existing.quantity);
        if quantity == 0 {
            return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
        }

        if changes.window.is_some() || changes.quantity.is_some() {
            inventory
                .replace_manual(existing.inventory_id, id, manual_entry(id, window, quantity))
                .await?;
            set.insert("start_date", window.stored_start());
            set.insert("end_date", window.stored_end());
            set.insert("quantity", quantity as i64);
        }

        if !set.is_empty() {
            self.base.update_by_id(id, doc! { "$set": set }).await?;
        }
        self.base.find_by_id(id).await
    }

    pub async fn delete(
        &self,
        inventory: &GearInventoryDao,
        existing: &ManualReservation,
    ) -> DaoResult<u32> {
        let id = existing.id.ok_or(DaoError::NotFound)?;
        let deleted = self.base.hard_delete(doc! { "_id": id }).await?;
        if deleted == 0 {
            return Err(DaoError::NotFound);
        }
        inventory.release_manual(existing.inventory_id, id).await
    }

    pub async fn all_windows(&self) -> DaoResult<Vec<(ObjectId, DayRange)>> {
        Ok(self
            .base
            .find_many(doc! {}, None)
            .await?
            .into_iter()
            .filter_map(|r| {
                r.id.map(|id| (id, DayRange::from_stored(r.start_date, r.end_date)))
            })
            .collect())
    }
}

fn manual_entry(manual_id: ObjectId, window: DayRange, quantity: u32) -> InventoryReservation {
    InventoryReservation {
        reservation_id: None,
        manual_reservation_id: Some(manual_id),
        event_id: None,
        user_id: None,
        check_out_date: window.stored_start(),
        check_in_date: window.stored_end(),
        quantity,
        created_at: DateTime::now(),
    }
}
