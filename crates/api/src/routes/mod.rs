pub mod auth;
pub mod chat;
pub mod gear_package;
pub mod inventory;
pub mod manual_reservation;
pub mod reserved_gear;
pub mod table;
pub mod user;

use bson::{DateTime, oid::ObjectId};

use crate::error::ApiError;

pub(crate) fn rfc3339(value: DateTime) -> String {
    value.try_to_rfc3339_string().unwrap_or_default()
}

/// Stored documents always carry an id; a missing one is a server bug.
pub(crate) fn stored_id(id: Option<ObjectId>) -> Result<ObjectId, ApiError> {
    id.ok_or_else(|| ApiError::Internal("Stored document has no id".to_string()))
}
