use bson::{doc, oid::ObjectId, DateTime, Document};
use lumdash_db::models::{GearInventoryItem, InventoryReservation};
use mongodb::Database;
use tracing::{debug, info, warn};

use super::base::{BaseDao, DaoError, DaoResult};
use super::manual_reservation::ManualReservationDao;
use super::reserved_gear::ReservedGearDao;
use super::table::TableDao;
use crate::reservation::{
    Availability, DayRange, LiveReferences, ReconcileReport, ReleaseTarget, availability,
    check_capacity, check_event_move, event_window, peak_usage, reconcile_entries, release_from,
};

pub struct GearInventoryDao {
    pub base: BaseDao<GearInventoryItem>,
    max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub label: String,
    pub brand: String,
    pub model: String,
    pub category: String,
    pub serial: Option<String>,
    pub quantity: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryChanges {
    pub label: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub category: Option<String>,
    pub serial: Option<Option<String>>,
    pub quantity: Option<u32>,
    pub notes: Option<String>,
}

/// Outcome of an edit closure passed to [`GearInventoryDao::edit_reservations`].
enum Edit<R> {
    Unchanged(R),
    Replace(Vec<InventoryReservation>, R),
}

impl GearInventoryDao {
    pub fn new(db: &Database, max_retries: u32) -> Self {
        Self {
            base: BaseDao::new(db, GearInventoryItem::COLLECTION),
            max_retries: max_retries.max(1),
        }
    }

    pub async fn create(&self, item: NewInventoryItem) -> DaoResult<GearInventoryItem> {
        if item.quantity == 0 {
            return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
        }

        let now = DateTime::now();
        let doc = GearInventoryItem {
            id: None,
            label: item.label,
            brand: item.brand,
            model: item.model,
            category: item.category,
            serial: normalize_serial(item.serial),
            quantity: item.quantity,
            notes: item.notes,
            reservations: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&doc).await?;
        self.base.find_by_id(id).await
    }

    pub async fn list(&self, category: Option<&str>) -> DaoResult<Vec<GearInventoryItem>> {
        let filter = match category {
            Some(category) => doc! { "category": category },
            None => doc! {},
        };
        self.base
            .find_many(filter, Some(doc! { "category": 1, "label": 1 }))
            .await
    }

    /// Applies catalog changes. Lowering the owned quantity below what is
    /// already promised on some day is refused.
    pub async fn update(&self, id: ObjectId, changes: InventoryChanges) -> DaoResult<GearInventoryItem> {
        let item = self.base.find_by_id(id).await?;

        let mut set = Document::new();
        if let Some(label) = changes.label {
            set.insert("label", label);
        }
        if let Some(brand) = changes.brand {
            set.insert("brand", brand);
        }
        if let Some(model) = changes.model {
            set.insert("model", model);
        }
        if let Some(category) = changes.category {
            set.insert("category", category);
        }
        if let Some(serial) = changes.serial {
            set.insert("serial", normalize_serial(serial));
        }
        if let Some(notes) = changes.notes {
            set.insert("notes", notes);
        }
        if let Some(quantity) = changes.quantity {
            if quantity == 0 {
                return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
            }
            let committed = peak_over_all(&item.reservations);
            if quantity < committed {
                return Err(DaoError::Conflict(format!(
                    "{committed} units are already reserved on some day"
                )));
            }
            set.insert("quantity", quantity as i64);
        }

        if !set.is_empty() {
            // Guarded by version so a concurrent reservation cannot slip in
            // between the check above and this write.
            let swapped = self
                .base
                .update_one(
                    version_filter(id, item.version),
                    doc! { "$set": set, "$inc": { "version": 1_i64 } },
                )
                .await?;
            if !swapped {
                return Err(DaoError::Conflict(
                    "Inventory item was modified concurrently".to_string(),
                ));
            }
        }

        self.base.find_by_id(id).await
    }

    pub async fn delete(&self, id: ObjectId) -> DaoResult<()> {
        let item = self.base.find_by_id(id).await?;
        if !item.reservations.is_empty() {
            return Err(DaoError::Conflict(format!(
                "{} has {} active reservation(s)",
                item.label,
                item.reservations.len()
            )));
        }

        let deleted = self
            .base
            .hard_delete(version_filter(id, item.version))
            .await?;
        if deleted == 0 {
            return Err(DaoError::Conflict(
                "Inventory item was modified concurrently".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn availability(&self, id: ObjectId, window: DayRange) -> DaoResult<Availability> {
        let item = self.base.find_by_id(id).await?;
        Ok(availability(&item, window))
    }

    pub async fn list_available(
        &self,
        window: DayRange,
        category: Option<&str>,
    ) -> DaoResult<Vec<(GearInventoryItem, Availability)>> {
        let items = self.list(category).await?;
        Ok(items
            .into_iter()
            .map(|item| {
                let report = availability(&item, window);
                (item, report)
            })
            .filter(|(_, report)| report.available > 0)
            .collect())
    }

    /// Adds `entry` if its quantity fits into the item's free capacity over
    /// the entry's dates.
    pub async fn reserve(&self, id: ObjectId, entry: InventoryReservation) -> DaoResult<()> {
        if entry.quantity == 0 {
            return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
        }
        let window = DayRange::from_stored(entry.check_out_date, entry.check_in_date);

        self.edit_reservations(id, |item| {
            check_capacity(item.quantity, &item.reservations, window, entry.quantity).map_err(
                |shortfall| DaoError::InsufficientStock(format!("{}: {}", item.label, shortfall)),
            )?;

            let mut entries = item.reservations.clone();
            entries.push(entry.clone());
            Ok(Edit::Replace(entries, ()))
        })
        .await?;

        debug!(%id, quantity = entry.quantity, "Reserved inventory");
        Ok(())
    }

    /// Releases up to `quantity` units held by `target` and returns how
    /// many were actually freed. A missing item or missing entries are
    /// logged and treated as nothing to release.
    pub async fn release_quantity(
        &self,
        id: ObjectId,
        target: ReleaseTarget,
        quantity: u32,
    ) -> DaoResult<u32> {
        let result = self
            .edit_reservations(id, |item| {
                let mut entries = item.reservations.clone();
                let released = release_from(&mut entries, &target, quantity);
                if released == 0 {
                    return Ok(Edit::Unchanged(0));
                }
                Ok(Edit::Replace(entries, released))
            })
            .await;

        match result {
            Ok(0) => {
                warn!(
                    %id,
                    event_id = %target.event_id,
                    user_id = %target.user_id,
                    quantity,
                    "No matching reservation to release"
                );
                Ok(0)
            }
            Ok(released) => {
                if released < quantity {
                    warn!(%id, requested = quantity, released, "Partial release");
                }
                Ok(released)
            }
            Err(DaoError::NotFound) => {
                warn!(%id, "Inventory item missing, nothing to release");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes every entry stamped with `reservation_id`, whatever its
    /// quantity.
    pub async fn release_reservation(&self, id: ObjectId, reservation_id: ObjectId) -> DaoResult<u32> {
        let result = self
            .edit_reservations(id, |item| {
                let (dropped, kept): (Vec<_>, Vec<_>) = item
                    .reservations
                    .iter()
                    .cloned()
                    .partition(|e| e.reservation_id == Some(reservation_id));
                if dropped.is_empty() {
                    return Ok(Edit::Unchanged(0));
                }
                Ok(Edit::Replace(kept, dropped.iter().map(|e| e.quantity).sum()))
            })
            .await;

        match result {
            Err(DaoError::NotFound) => {
                warn!(%id, %reservation_id, "Inventory item missing, nothing to release");
                Ok(0)
            }
            other => other,
        }
    }

    /// Removes the entries created for one manual reservation.
    pub async fn release_manual(&self, id: ObjectId, manual_id: ObjectId) -> DaoResult<u32> {
        let result = self
            .edit_reservations(id, |item| {
                let (dropped, kept): (Vec<_>, Vec<_>) = item
                    .reservations
                    .iter()
                    .cloned()
                    .partition(|e| e.manual_reservation_id == Some(manual_id));
                let released: u32 = dropped.iter().map(|e| e.quantity).sum();
                if dropped.is_empty() {
                    return Ok(Edit::Unchanged(0));
                }
                Ok(Edit::Replace(kept, released))
            })
            .await;

        match result {
            Err(DaoError::NotFound) => {
                warn!(%id, %manual_id, "Inventory item missing, nothing to release");
                Ok(0)
            }
            other => other,
        }
    }

    /// Swaps the entry of a manual reservation for `entry` in one write.
    /// The old entry does not count against the new one's capacity.
    pub async fn replace_manual(
        &self,
        id: ObjectId,
        manual_id: ObjectId,
        entry: InventoryReservation,
    ) -> DaoResult<()> {
        if entry.quantity == 0 {
            return Err(DaoError::invalid(&["quantity"], "quantity must be at least 1"));
        }
        let window = DayRange::from_stored(entry.check_out_date, entry.check_in_date);

        self.edit_reservations(id, |item| {
            let mut entries: Vec<InventoryReservation> = item
                .reservations
                .iter()
                .filter(|e| e.manual_reservation_id != Some(manual_id))
                .cloned()
                .collect();

            check_capacity(item.quantity, &entries, window, entry.quantity).map_err(|shortfall| {
                DaoError::InsufficientStock(format!("{}: {}", item.label, shortfall))
            })?;

            entries.push(entry.clone());
            Ok(Edit::Replace(entries, ()))
        })
        .await
    }

    /// Pulls every entry tied to an event from every item.
    pub async fn release_event(&self, event_id: ObjectId) -> DaoResult<u64> {
        let result = self
            .base
            .collection()
            .update_many(
                doc! { "reservations.event_id": event_id },
                doc! {
                    "$pull": { "reservations": { "event_id": event_id } },
                    "$inc": { "version": 1_i64 },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .await?;

        info!(%event_id, items = result.modified_count, "Released event reservations");
        Ok(result.modified_count)
    }

    /// Moves every entry tied to an event onto the event's gear window.
    /// The move is checked with `check_move` beforehand.
    pub async fn sync_event_dates(&self, event_id: ObjectId, window: DayRange) -> DaoResult<u64> {
        let update = doc! {
            "$set": {
                "reservations.$[entry].check_out_date": window.stored_start(),
                "reservations.$[entry].check_in_date": window.stored_end(),
                "updated_at": DateTime::now(),
            },
            "$inc": { "version": 1_i64 },
        };
        let opts = mongodb::options::UpdateOptions::builder()
            .array_filters(vec![doc! { "entry.event_id": event_id }])
            .build();

        let result = self
            .base
            .collection()
            .update_many(doc! { "reservations.event_id": event_id }, update)
            .with_options(opts)
            .await?;

        info!(%event_id, items = result.modified_count, "Synced reservation dates to event");
        Ok(result.modified_count)
    }

    /// Refuses a move of the event's entries onto `window` when any item
    /// would be booked beyond its owned quantity there. Nothing is written.
    pub async fn check_move(&self, event_id: ObjectId, window: DayRange) -> DaoResult<()> {
        let items = self
            .base
            .find_many(doc! { "reservations.event_id": event_id }, None)
            .await?;

        for item in items {
            check_event_move(item.quantity, &item.reservations, event_id, window).map_err(
                |shortfall| {
                    warn!(%event_id, item = %item.label, "Event window move would overbook");
                    DaoError::InsufficientStock(format!("{}: {}", item.label, shortfall))
                },
            )?;
        }
        Ok(())
    }

    /// Overwrites an item's reservation list if the item is still at
    /// `expected_version`.
    pub async fn replace_reservations(
        &self,
        id: ObjectId,
        expected_version: i64,
        entries: &[InventoryReservation],
    ) -> DaoResult<bool> {
        let entries = bson::to_bson(entries)?;
        self.base
            .update_one(
                version_filter(id, expected_version),
                doc! { "$set": { "reservations": entries }, "$inc": { "version": 1_i64 } },
            )
            .await
    }

    /// Brings every item's reservation list back in line with the records
    /// it points at: entries of deleted reserved items, manual reservations
    /// and events are dropped, and surviving entries take their owner's
    /// current dates.
    pub async fn reconcile(
        &self,
        reserved: &ReservedGearDao,
        manual: &ManualReservationDao,
        tables: &TableDao,
    ) -> DaoResult<ReconcileReport> {
        let mut live = LiveReferences::default();
        live.reserved_items.extend(reserved.all_ids().await?);
        live.manual_reservations.extend(manual.all_windows().await?);
        for table in tables.all().await? {
            if let Some(id) = table.id {
                live.events.insert(id, event_window(&table).ok());
            }
        }

        let mut report = ReconcileReport::default();
        for item in self.base.find_many(doc! {}, None).await? {
            report.items_scanned += 1;
            let Some(id) = item.id else { continue };

            let outcome = reconcile_entries(&item.reservations, &live);
            if !outcome.changed() {
                continue;
            }

            if self
                .replace_reservations(id, item.version, &outcome.entries)
                .await?
            {
                report.items_updated += 1;
                report.orphaned_removed += u64::from(outcome.removed);
                report.dates_corrected += u64::from(outcome.corrected);
            } else {
                warn!(%id, "Item changed during reconciliation, skipped");
                report.items_skipped += 1;
            }
        }

        info!(
            scanned = report.items_scanned,
            updated = report.items_updated,
            removed = report.orphaned_removed,
            corrected = report.dates_corrected,
            "Reconciled inventory reservations"
        );
        Ok(report)
    }

    /// Read-modify-write loop over an item's reservations, retried while
    /// another writer bumps the version underneath.
    async fn edit_reservations<R, F>(&self, id: ObjectId, mut edit: F) -> DaoResult<R>
    where
        F: FnMut(&GearInventoryItem) -> DaoResult<Edit<R>>,
    {
        for attempt in 1..=self.max_retries {
            let item = self.base.find_by_id(id).await?;

            match edit(&item)? {
                Edit::Unchanged(result) => return Ok(result),
                Edit::Replace(entries, result) => {
                    if self.replace_reservations(id, item.version, &entries).await? {
                        return Ok(result);
                    }
                    debug!(%id, attempt, "Inventory item changed concurrently, retrying");
                }
            }
        }

        warn!(%id, retries = self.max_retries, "Gave up updating inventory reservations");
        Err(DaoError::Conflict(
            "Inventory item is being modified concurrently, try again".to_string(),
        ))
    }
}

/// Matches `id` at `version`. Items that predate versioning have no field
/// at all and count as version zero.
fn version_filter(id: ObjectId, version: i64) -> Document {
    if version == 0 {
        doc! {
            "_id": id,
            "$or": [{ "version": 0_i64 }, { "version": { "$exists": false } }],
        }
    } else {
        doc! { "_id": id, "version": version }
    }
}

fn normalize_serial(serial: Option<String>) -> Option<String> {
    serial
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Peak usage over the whole span covered by `entries`.
fn peak_over_all(entries: &[InventoryReservation]) -> u32 {
    let mut ranges = entries
        .iter()
        .map(|e| DayRange::from_stored(e.check_out_date, e.check_in_date));
    let Some(first) = ranges.next() else {
        return 0;
    };
    let span = ranges.fold(first, |acc, r| DayRange {
        start: acc.start.min(r.start),
        end: acc.end.max(r.end),
    });
    peak_usage(entries, span)
}
