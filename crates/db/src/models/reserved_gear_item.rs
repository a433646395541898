use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedGearItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub event_id: ObjectId,
    pub user_id: ObjectId,
    pub list_name: String,
    pub inventory_id: ObjectId,
    pub label: String,
    pub brand: String,
    pub model: String,
    pub category: String,
    pub quantity: u32,
    pub serial: Option<String>,
    #[serde(default)]
    pub specific_serial_requested: bool,
    #[serde(default)]
    pub is_packed: bool,
    pub packed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl ReservedGearItem {
    pub const COLLECTION: &'static str = "reserved_gear_items";
}
