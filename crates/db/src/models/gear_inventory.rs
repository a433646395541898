use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A catalog entry for a piece of gear together with every claim on it.
///
/// Serialized gear is usually stored one document per serial with
/// `quantity == 1`; bulk items (cables, batteries) carry a larger quantity
/// and no serial. `version` is bumped on every write to `reservations` and
/// is used as a compare-and-swap guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearInventoryItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub label: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    pub category: String,
    pub serial: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub notes: Option<String>,
    #[serde(default)]
    pub reservations: Vec<InventoryReservation>,
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// One claim on an inventory item. Dates are UTC midnights and the range
/// is inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryReservation {
    /// `_id` of the owning `ReservedGearItem`. Absent on legacy entries.
    pub reservation_id: Option<ObjectId>,
    pub manual_reservation_id: Option<ObjectId>,
    pub event_id: Option<ObjectId>,
    pub user_id: Option<ObjectId>,
    pub check_out_date: DateTime,
    pub check_in_date: DateTime,
    pub quantity: u32,
    pub created_at: DateTime,
}

fn default_quantity() -> u32 {
    1
}

impl GearInventoryItem {
    pub const COLLECTION: &'static str = "gear_inventory";
}
