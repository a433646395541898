use std::collections::HashMap;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use bson::oid::ObjectId;

use super::parse_id;
use crate::error::ApiError;

/// Extracts the event id from the `{table_id}` path parameter.
#[derive(Debug, Clone, Copy)]
pub struct TableId(pub ObjectId);

impl<S> FromRequestParts<S> for TableId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params): Path<HashMap<String, String>> =
            Path::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::BadRequest("Missing path parameters".to_string()))?;

        let raw = params
            .get("table_id")
            .ok_or_else(|| ApiError::BadRequest("Missing table_id parameter".to_string()))?;

        Ok(TableId(parse_id(raw, "table_id")?))
    }
}
