use std::collections::{HashMap, HashSet};

use bson::oid::ObjectId;
use lumdash_db::models::InventoryReservation;
use serde::Serialize;

use super::dates::DayRange;

/// Everything an inventory reservation entry may legitimately point at.
#[derive(Debug, Default)]
pub struct LiveReferences {
    pub reserved_items: HashSet<ObjectId>,
    pub manual_reservations: HashMap<ObjectId, DayRange>,
    /// Every existing event, with its gear window when one is set.
    pub events: HashMap<ObjectId, Option<DayRange>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub entries: Vec<InventoryReservation>,
    pub removed: u32,
    pub corrected: u32,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        self.removed > 0 || self.corrected > 0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub items_scanned: u64,
    pub items_updated: u64,
    pub items_skipped: u64,
    pub orphaned_removed: u64,
    pub dates_corrected: u64,
}

/// Drops entries whose owner no longer exists and moves the dates of the
/// rest back onto their owner's window.
pub fn reconcile_entries(
    entries: &[InventoryReservation],
    live: &LiveReferences,
) -> ReconcileOutcome {
    let mut kept = Vec::with_capacity(entries.len());
    let mut removed = 0;
    let mut corrected = 0;

    for entry in entries {
        let window = if let Some(manual_id) = entry.manual_reservation_id {
            match live.manual_reservations.get(&manual_id) {
                Some(window) => Some(*window),
                None => {
                    removed += 1;
                    continue;
                }
            }
        } else {
            let owner_alive = match entry.reservation_id {
                Some(reservation_id) => live.reserved_items.contains(&reservation_id),
                None => entry
                    .event_id
                    .is_some_and(|event_id| live.events.contains_key(&event_id)),
            };
            if !owner_alive {
                removed += 1;
                continue;
            }
            entry
                .event_id
                .and_then(|event_id| live.events.get(&event_id).copied().flatten())
        };

        let mut entry = entry.clone();
        if let Some(window) = window {
            let (out, back) = (window.stored_start(), window.stored_end());
            if entry.check_out_date != out || entry.check_in_date != back {
                entry.check_out_date = out;
                entry.check_in_date = back;
                corrected += 1;
            }
        }
        kept.push(entry);
    }

    ReconcileOutcome {
        entries: kept,
        removed,
        corrected,
    }
}
