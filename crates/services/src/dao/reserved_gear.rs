use bson::{doc, oid::ObjectId, DateTime, Document};
use lumdash_db::models::{InventoryReservation, ReservedGearItem, Table};
use mongodb::Database;
use tracing::{error, info, warn};

use super::base::{BaseDao, DaoError, DaoResult};
use super::gear_inventory::GearInventoryDao;
use crate::reservation::{ReleaseTarget, event_window};

pub struct ReservedGearDao {
    pub base: BaseDao<ReservedGearItem>,
}

#[derive(Debug, Clone)]
pub struct NewReservedGear {
    pub inventory_id: ObjectId,
    pub list_name: String,
    pub quantity: u32,
    pub serial: Option<String>,
    pub specific_serial_requested: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReservedGearChanges {
    pub list_name: Option<String>,
    pub is_packed: Option<bool>,
    pub quantity: Option<u32>,
}

impl ReservedGearDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, ReservedGearItem::COLLECTION),
        }
    }

    /// Claims inventory for `event` on behalf of `user_id` and records the
    /// claim. The inventory is reserved first; if the record cannot be
    /// written the inventory claim is given back.
    pub async fn reserve(
        &self,
        inventory: &GearInventoryDao,
        event: &Table,
        user_id: ObjectId,
        request: NewReservedGear,
    ) -> DaoResult<ReservedGearItem> {
        let event_id = event.id.ok_or(DaoError::NotFound)?;
        if request.quantity == 0 {
            return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
        }
        let list_name = request.list_name.trim().to_string();
        if list_name.is_empty() {
            return Err(DaoError::invalid(&["list_name"], "list_name is required"));
        }
        let window = event_window(event).map_err(DaoError::event_dates)?;

        let item = inventory.base.find_by_id(request.inventory_id).await?;
        let requested_serial = request
            .serial
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if request.specific_serial_requested {
            match (&requested_serial, &item.serial) {
                (Some(wanted), Some(actual)) if wanted.eq_ignore_ascii_case(actual) => {}
                (Some(wanted), _) => {
                    return Err(DaoError::invalid(
                        &["serial"],
                        format!("{} does not carry serial {wanted}", item.label),
                    ));
                }
                (None, _) => {
                    return Err(DaoError::invalid(
                        &["serial"],
                        "serial is required when a specific serial is requested",
                    ));
                }
            }
        }

        let reservation_id = ObjectId::new();
        let now = DateTime::now();

        inventory
            .reserve(
                request.inventory_id,
                InventoryReservation {
                    reservation_id: Some(reservation_id),
                    manual_reservation_id: None,
                    event_id: Some(event_id),
                    user_id: Some(user_id),
                    check_out_date: window.stored_start(),
                    check_in_date: window.stored_end(),
                    quantity: request.quantity,
                    created_at: now,
                },
            )
            .await?;

        let record = ReservedGearItem {
            id: Some(reservation_id),
            event_id,
            user_id,
            list_name,
            inventory_id: request.inventory_id,
            label: item.label,
            brand: item.brand,
            model: item.model,
            category: item.category,
            quantity: request.quantity,
            serial: requested_serial.or(item.serial),
            specific_serial_requested: request.specific_serial_requested,
            is_packed: false,
            packed_at: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.base.insert_one(&record).await {
            error!(%reservation_id, %e, "Failed to record reserved gear, releasing inventory");
            if let Err(release_err) = inventory
                .release_reservation(request.inventory_id, reservation_id)
                .await
            {
                error!(%reservation_id, %release_err, "Compensating release failed");
            }
            return Err(e);
        }

        info!(%reservation_id, %event_id, %user_id, "Reserved gear");
        self.base.find_by_id(reservation_id).await
    }

    pub async fn list_for_event(
        &self,
        event_id: ObjectId,
        user_id: Option<ObjectId>,
        list_name: Option<&str>,
    ) -> DaoResult<Vec<ReservedGearItem>> {
        let mut filter = doc! { "event_id": event_id };
        if let Some(user_id) = user_id {
            filter.insert("user_id", user_id);
        }
        if let Some(list_name) = list_name {
            filter.insert("list_name", list_name);
        }
        self.base
            .find_many(filter, Some(doc! { "list_name": 1, "category": 1, "label": 1 }))
            .await
    }

    pub async fn list_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<ReservedGearItem>> {
        self.base
            .find_many(doc! { "user_id": user_id }, Some(doc! { "created_at": -1 }))
            .await
    }

    /// Loads a reserved item of `event_id` that belongs to `user_id`.
    /// Items of other users read as missing.
    pub async fn find_owned(
        &self,
        id: ObjectId,
        event_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<ReservedGearItem> {
        self.base
            .find_one(doc! { "_id": id, "event_id": event_id, "user_id": user_id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn update(
        &self,
        inventory: &GearInventoryDao,
        event: &Table,
        item: &ReservedGearItem,
        changes: ReservedGearChanges,
    ) -> DaoResult<ReservedGearItem> {
        let id = item.id.ok_or(DaoError::NotFound)?;
        let mut set = Document::new();

        if let Some(list_name) = changes.list_name {
            let list_name = list_name.trim().to_string();
            if list_name.is_empty() {
                return Err(DaoError::invalid(&["list_name"], "list_name is required"));
            }
            set.insert("list_name", list_name);
        }

        if let Some(is_packed) = changes.is_packed {
            if is_packed != item.is_packed {
                set.insert("is_packed", is_packed);
                set.insert("packed_at", is_packed.then(DateTime::now));
            }
        }

        let mut filter = doc! { "_id": id };
        let mut resized = None;
        if let Some(quantity) = changes.quantity {
            if quantity == 0 {
                return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
            }
            if quantity != item.quantity {
                self.adjust_quantity(inventory, event, item, item.quantity, quantity)
                    .await?;
                set.insert("quantity", quantity as i64);
                // The inventory delta was computed from this quantity.
                filter.insert("quantity", item.quantity as i64);
                resized = Some(quantity);
            }
        }

        if !set.is_empty() {
            let written = self.base.update_one(filter, doc! { "$set": set }).await;
            if !matches!(written, Ok(true)) {
                if let Some(quantity) = resized {
                    if let Err(e) = self
                        .adjust_quantity(inventory, event, item, quantity, item.quantity)
                        .await
                    {
                        error!(reservation_id = %id, %e, "Failed to undo inventory resize");
                    }
                }
                return match written {
                    Err(e) => Err(e),
                    Ok(_) if resized.is_some() => Err(DaoError::Conflict(
                        "Reserved item was modified concurrently, try again".to_string(),
                    )),
                    Ok(_) => Err(DaoError::NotFound),
                };
            }
        }
        self.base.find_by_id(id).await
    }

    /// Moves the inventory claim of `item` from `from` units to `to` units.
    async fn adjust_quantity(
        &self,
        inventory: &GearInventoryDao,
        event: &Table,
        item: &ReservedGearItem,
        from: u32,
        to: u32,
    ) -> DaoResult<()> {
        let target = ReleaseTarget {
            event_id: item.event_id,
            user_id: item.user_id,
            reservation_id: item.id,
        };

        if to > from {
            let window = event_window(event).map_err(DaoError::event_dates)?;
            inventory
                .reserve(
                    item.inventory_id,
                    InventoryReservation {
                        reservation_id: item.id,
                        manual_reservation_id: None,
                        event_id: Some(item.event_id),
                        user_id: Some(item.user_id),
                        check_out_date: window.stored_start(),
                        check_in_date: window.stored_end(),
                        quantity: to - from,
                        created_at: DateTime::now(),
                    },
                )
                .await?;
        } else if to < from {
            inventory
                .release_quantity(item.inventory_id, target, from - to)
                .await?;
        }
        Ok(())
    }

    /// Deletes the record, then gives its quantity back to the inventory.
    /// The release is best effort: failures are logged and left for
    /// reconciliation.
    pub async fn remove(
        &self,
        inventory: &GearInventoryDao,
        item: &ReservedGearItem,
    ) -> DaoResult<u32> {
        let id = item.id.ok_or(DaoError::NotFound)?;
        let deleted = self.base.hard_delete(doc! { "_id": id }).await?;
        if deleted == 0 {
            return Err(DaoError::NotFound);
        }

        let target = ReleaseTarget {
            event_id: item.event_id,
            user_id: item.user_id,
            reservation_id: Some(id),
        };
        match inventory
            .release_quantity(item.inventory_id, target, item.quantity)
            .await
        {
            Ok(released) => Ok(released),
            Err(e) => {
                warn!(reservation_id = %id, %e, "Release after delete failed");
                Ok(0)
            }
        }
    }

    pub async fn remove_for_event(&self, event_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "event_id": event_id }).await
    }

    pub async fn all_ids(&self) -> DaoResult<Vec<ObjectId>> {
        let values = self.base.collection().distinct("_id", doc! {}).await?;
        Ok(values.into_iter().filter_map(|v| v.as_object_id()).collect())
    }
}
