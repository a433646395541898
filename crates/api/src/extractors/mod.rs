pub mod auth;
pub mod json;
pub mod table;

use bson::oid::ObjectId;

use crate::error::ApiError;

/// Parses a hex object id taken from a path, query or body field.
pub fn parse_id(raw: &str, name: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {name}")))
}
