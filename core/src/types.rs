//! Entity and response DTOs.
//!
//! # Design
//! Entities are untyped JSON objects; their shape is checked by the backend
//! against the table schema, never here. `RateLimit` is kept opaque for the
//! same reason.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend-assigned identifier of an entity.
pub type EntityId = String;

/// A single record: field name to scalar value.
pub type Entity = Map<String, Value>;

/// One page of a `get_entities` read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntitiesResponse {
    pub entities: Vec<Entity>,
    /// Number of matching entities ignoring pagination.
    pub total_count: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Rate limit snapshot as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateLimit(pub Value);

impl RateLimit {
    /// Look up a top-level field of the snapshot.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotalEntityCount {
    #[serde(alias = "count")]
    pub total_entity_count: u64,
}
