//! Wire envelope: JSON:API-like documents as sent and received.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::cursor::Cursor;

/// `(type, id)` reference to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireRef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
}

impl WireRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Relationship linkage: `null`, a single ref, or an array of refs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<WireRef>),
    One(WireRef),
    #[default]
    Empty,
}

impl RelationshipData {
    pub fn refs(&self) -> Vec<&WireRef> {
        match self {
            RelationshipData::Many(refs) => refs.iter().collect(),
            RelationshipData::One(r) => vec![r],
            RelationshipData::Empty => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: RelationshipData,
}

impl Relationship {
    pub fn one(r: WireRef) -> Self {
        Self {
            data: RelationshipData::One(r),
        }
    }

    pub fn many(refs: Vec<WireRef>) -> Self {
        Self {
            data: RelationshipData::Many(refs),
        }
    }
}

/// One resource object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireEntity {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_id"
    )]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl WireEntity {
    pub fn new(kind: impl Into<String>, id: Option<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    pub fn attr_str(&self, name: &str) -> Option<String> {
        self.attribute(name).and_then(Value::as_str).map(str::to_string)
    }

    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attribute(name).and_then(Value::as_bool)
    }

    pub fn attr_i64(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(Value::as_i64)
    }

    /// Deserialize one attribute into `T`; mismatched shapes read as `None`.
    pub fn attr<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.attribute(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn meta_value(&self, name: &str) -> Option<&Value> {
        self.meta.get(name).filter(|v| !v.is_null())
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipData> {
        self.relationships.get(name).map(|r| &r.data)
    }
}

impl tenantkit_auth::RecordFields for WireEntity {
    fn field(&self, name: &str) -> Option<&str> {
        if name == "id" {
            return self.id.as_deref();
        }
        if let Some(value) = self.attributes.get(name).and_then(Value::as_str) {
            return Some(value);
        }
        match self.relationships.get(name).map(|r| &r.data) {
            Some(RelationshipData::One(r)) => Some(r.id.as_str()),
            _ => None,
        }
    }
}

/// Primary data of a document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<WireEntity>),
    One(Box<WireEntity>),
    #[default]
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cursors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Cursor>,
    #[serde(default, alias = "prev", skip_serializing_if = "Option::is_none")]
    pub previous: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default)]
    pub cursors: Cursors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Response document: primary data + included graph + envelope meta.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: PrimaryData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<WireEntity>,
    #[serde(default)]
    pub meta: DocumentMeta,
}

impl Document {
    pub fn single(entity: WireEntity) -> Self {
        Self {
            data: PrimaryData::One(Box::new(entity)),
            ..Default::default()
        }
    }

    pub fn collection(entities: Vec<WireEntity>) -> Self {
        Self {
            data: PrimaryData::Many(entities),
            ..Default::default()
        }
    }

    pub fn with_included(mut self, included: Vec<WireEntity>) -> Self {
        self.included = included;
        self
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.data, PrimaryData::Many(_))
    }
}

/// Write payload: `{ data: { type, id?, attributes, relationships } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    pub data: WireEntity,
}

/// Error body: `{ ok: false, status, error }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(value: RawId) -> Self {
        match value {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    RawId::deserialize(d).map(String::from)
}

fn optional_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(d)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_relationship_shapes() {
        let entity: WireEntity = serde_json::from_value(json!({
            "id": 7,
            "type": "users",
            "attributes": { "name": "Ann", "nickname": null },
            "relationships": {
                "company": { "data": { "type": "companies", "id": "c1" } },
                "roles": { "data": [{ "type": "roles", "id": "r1" }, { "type": "roles", "id": 2 }] },
                "manager": { "data": null },
                "avatar": {}
            }
        }))
        .unwrap();

        assert_eq!(entity.id.as_deref(), Some("7"));
        assert_eq!(entity.attr_str("name").as_deref(), Some("Ann"));
        assert_eq!(entity.attribute("nickname"), None);
        assert_eq!(
            entity.relationship("company"),
            Some(&RelationshipData::One(WireRef::new("companies", "c1")))
        );
        assert_eq!(entity.relationship("roles").unwrap().refs().len(), 2);
        assert_eq!(entity.relationship("roles").unwrap().refs()[1].id, "2");
        assert_eq!(entity.relationship("manager"), Some(&RelationshipData::Empty));
        assert_eq!(entity.relationship("avatar"), Some(&RelationshipData::Empty));
    }

    #[test]
    fn decodes_collection_envelope() {
        let doc: Document = serde_json::from_value(json!({
            "data": [{ "type": "roles", "id": "r1", "attributes": {} }],
            "meta": { "cursors": { "next": "abc", "prev": "xyz" }, "total": 12 }
        }))
        .unwrap();

        assert!(doc.is_collection());
        assert_eq!(doc.meta.cursors.next.as_ref().unwrap().as_str(), "abc");
        assert_eq!(doc.meta.cursors.previous.as_ref().unwrap().as_str(), "xyz");
        assert_eq!(doc.meta.total, Some(12));
    }

    #[test]
    fn record_fields_cover_relationship_ids() {
        use tenantkit_auth::RecordFields;

        let entity: WireEntity = serde_json::from_value(json!({
            "id": "n1",
            "type": "notifications",
            "attributes": { "title": "hi" },
            "relationships": { "user": { "data": { "type": "users", "id": "u1" } } }
        }))
        .unwrap();

        assert_eq!(entity.field("id"), Some("n1"));
        assert_eq!(entity.field("title"), Some("hi"));
        assert_eq!(entity.field("user"), Some("u1"));
        assert_eq!(entity.field("missing"), None);
    }
}
