//! Dehydration: write intents → wire payloads.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use tenantkit_core::{DataError, DataResult};

use crate::kind::EntityKind;
use crate::registry::TypeRegistry;
use crate::wire::{Relationship, WireEntity, WirePayload, WireRef};

/// Serialize a write intent into an attribute map.
///
/// Fields the input skips (typically `None` options) are absent from the map;
/// present falsy values (`false`, `""`, `0`) are kept.
pub fn attributes_of<T: Serialize + ?Sized>(input: &T) -> DataResult<Map<String, Value>> {
    match serde_json::to_value(input)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(DataError::decode(format!(
            "write intent must serialize to an object, got {other}"
        ))),
    }
}

/// Set a to-one relationship when `id` is present.
pub fn relate_one(
    wire: &mut WireEntity,
    name: &str,
    kind: &str,
    id: Option<&str>,
) {
    if let Some(id) = id {
        wire.relationships
            .insert(name.to_string(), Relationship::one(WireRef::new(kind, id)));
    }
}

/// Set a to-many relationship when `ids` is present. An empty slice is
/// emitted as an empty linkage (clears the relationship server-side).
pub fn relate_many<S: AsRef<str>>(
    wire: &mut WireEntity,
    name: &str,
    kind: &str,
    ids: Option<&[S]>,
) {
    if let Some(ids) = ids {
        let refs = ids.iter().map(|id| WireRef::new(kind, id.as_ref())).collect();
        wire.relationships
            .insert(name.to_string(), Relationship::many(refs));
    }
}

/// Builds write payloads using the registered logical names.
#[derive(Debug, Clone)]
pub struct Dehydrator {
    registry: Arc<TypeRegistry>,
}

impl Dehydrator {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Payload for creating a `K`.
    pub fn to_wire<K: EntityKind>(&self, input: &K::Input) -> DataResult<WirePayload> {
        self.to_wire_for::<K>(None, input)
    }

    /// Payload for writing a `K`, optionally addressed by `id`.
    pub fn to_wire_for<K: EntityKind>(
        &self,
        id: Option<&str>,
        input: &K::Input,
    ) -> DataResult<WirePayload> {
        let descriptor = self.registry.find_by_type::<K>()?;
        let mut data = K::dehydrate(input)?;
        data.kind = descriptor.logical_name().to_string();
        if let Some(id) = id {
            data.id = Some(id.to_string());
        }
        Ok(WirePayload { data })
    }
}
