use bson::oid::ObjectId;
use chrono::NaiveDate;
use lumdash_db::models::{GearInventoryItem, InventoryReservation};
use serde::Serialize;

use super::dates::DayRange;

/// Highest number of units claimed on any single day of `window`.
///
/// Reservations are inclusive day ranges, so a check-in day and another
/// event's check-out day on the same date count as a clash.
pub fn peak_usage<'a, I>(reservations: I, window: DayRange) -> u32
where
    I: IntoIterator<Item = &'a InventoryReservation>,
{
    let mut deltas: Vec<(NaiveDate, i64)> = Vec::new();

    for reservation in reservations {
        let range = DayRange::from_stored(reservation.check_out_date, reservation.check_in_date);
        if !range.overlaps(&window) {
            continue;
        }
        let first = range.start.max(window.start);
        let last = range.end.min(window.end);
        let quantity = i64::from(reservation.quantity);

        deltas.push((first, quantity));
        if let Some(after) = last.succ_opt() {
            deltas.push((after, -quantity));
        }
    }

    // Releases sort before claims on the same day.
    deltas.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut current: i64 = 0;
    let mut peak: i64 = 0;
    for (_, delta) in deltas {
        current += delta;
        peak = peak.max(current);
    }

    u32::try_from(peak).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub owned: u32,
    pub peak_reserved: u32,
    pub available: u32,
}

pub fn availability(item: &GearInventoryItem, window: DayRange) -> Availability {
    let peak_reserved = peak_usage(&item.reservations, window);
    Availability {
        owned: item.quantity,
        peak_reserved,
        available: item.quantity.saturating_sub(peak_reserved),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub requested: u32,
    pub available: u32,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "requested {} but only {} available for the selected dates",
            self.requested, self.available
        )
    }
}

/// Checks that `quantity` more units fit into `window` on top of
/// `existing`.
pub fn check_capacity<'a, I>(
    owned: u32,
    existing: I,
    window: DayRange,
    quantity: u32,
) -> Result<(), Shortfall>
where
    I: IntoIterator<Item = &'a InventoryReservation>,
{
    let available = owned.saturating_sub(peak_usage(existing, window));
    if quantity > available {
        return Err(Shortfall {
            requested: quantity,
            available,
        });
    }
    Ok(())
}

/// Checks that every entry of `event_id` still fits once moved onto
/// `window`. The event's own entries do not count against themselves.
pub fn check_event_move(
    owned: u32,
    entries: &[InventoryReservation],
    event_id: ObjectId,
    window: DayRange,
) -> Result<(), Shortfall> {
    let (own, others): (Vec<_>, Vec<_>) = entries
        .iter()
        .partition(|e| e.event_id == Some(event_id));
    let held = own.iter().map(|e| e.quantity).sum();
    check_capacity(owned, others, window, held)
}

/// Which entries a release may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseTarget {
    pub event_id: ObjectId,
    pub user_id: ObjectId,
    /// When set, entries with this id are consumed first, followed by
    /// legacy entries of the same event and user that carry no id. Entries
    /// belonging to other reserved items are never touched.
    pub reservation_id: Option<ObjectId>,
}

impl ReleaseTarget {
    fn owns(&self, entry: &InventoryReservation) -> bool {
        entry.event_id == Some(self.event_id) && entry.user_id == Some(self.user_id)
    }
}

/// Decrements matching entries until `quantity` units are freed, newest
/// entries first, and drops entries that reach zero. Returns the number of
/// units actually released.
pub fn release_from(
    entries: &mut Vec<InventoryReservation>,
    target: &ReleaseTarget,
    quantity: u32,
) -> u32 {
    let mut order: Vec<usize> = Vec::new();

    match target.reservation_id {
        Some(reservation_id) => {
            order.extend(
                (0..entries.len())
                    .rev()
                    .filter(|&i| entries[i].reservation_id == Some(reservation_id)),
            );
            order.extend((0..entries.len()).rev().filter(|&i| {
                entries[i].reservation_id.is_none()
                    && entries[i].manual_reservation_id.is_none()
                    && target.owns(&entries[i])
            }));
        }
        None => {
            order.extend(
                (0..entries.len())
                    .rev()
                    .filter(|&i| entries[i].manual_reservation_id.is_none() && target.owns(&entries[i])),
            );
        }
    }

    let mut remaining = quantity;
    for index in order {
        if remaining == 0 {
            break;
        }
        let entry = &mut entries[index];
        let taken = entry.quantity.min(remaining);
        entry.quantity -= taken;
        remaining -= taken;
    }

    entries.retain(|entry| entry.quantity > 0);
    quantity - remaining
}
