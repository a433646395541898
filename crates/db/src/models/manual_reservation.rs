use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Admin-entered reservation for someone outside the event workflow
/// (rentals, loans, repairs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualReservation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub person_name: String,
    pub person_email: Option<String>,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub inventory_id: ObjectId,
    pub label: String,
    pub brand: String,
    pub model: String,
    pub category: String,
    pub quantity: u32,
    pub serial: Option<String>,
    pub created_by: ObjectId,
    pub notes: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl ManualReservation {
    pub const COLLECTION: &'static str = "manual_reservations";
}
