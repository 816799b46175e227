//! Hydration: wire documents → typed, relationship-aware entities.
//!
//! A pass is a depth-first walk from the primary data through relationship
//! references into `included`. Every `(type, id)` is hydrated at most once per
//! pass; a reference to a pair already reserved (including one still being
//! built, as happens with cycles) resolves to the reserved slot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use tenantkit_core::{DataError, DataResult, EntityBase};

use crate::graph::{AnyEntity, EntityGraph, EntityKey, Link, Node};
use crate::kind::EntityKind;
use crate::registry::{EntityDescriptor, TypeRegistry};
use crate::wire::{Document, PrimaryData, RelationshipData, WireEntity, WireRef};

/// State of one hydration pass, handed to [`EntityKind::rehydrate`].
pub struct Hydration<'a> {
    registry: &'a TypeRegistry,
    pool: HashMap<EntityKey, &'a WireEntity>,
    index: HashMap<EntityKey, usize>,
    slots: Vec<Option<Box<dyn AnyEntity>>>,
    failure: Option<DataError>,
}

impl<'a> Hydration<'a> {
    fn new(registry: &'a TypeRegistry, document: &'a Document) -> Self {
        let primary: Vec<&'a WireEntity> = match &document.data {
            PrimaryData::Many(entities) => entities.iter().collect(),
            PrimaryData::One(entity) => vec![entity.as_ref()],
            PrimaryData::Null => Vec::new(),
        };

        let mut pool = HashMap::new();
        for wire in primary.into_iter().chain(document.included.iter()) {
            if let Some(id) = &wire.id {
                pool.entry(EntityKey::new(&wire.kind, id)).or_insert(wire);
            }
        }

        Self {
            registry,
            pool,
            index: HashMap::new(),
            slots: Vec::new(),
            failure: None,
        }
    }

    /// Resolve a to-one relationship. Absent, null, or unresolvable
    /// references yield `None`.
    pub fn read_one<R: EntityKind>(&mut self, wire: &WireEntity, name: &str) -> Option<Link<R>> {
        let target = match wire.relationship(name)? {
            RelationshipData::One(r) => r.clone(),
            RelationshipData::Many(refs) => {
                tracing::debug!(
                    relationship = name,
                    "to-many linkage read as to-one; using first reference"
                );
                refs.first()?.clone()
            }
            RelationshipData::Empty => return None,
        };
        self.resolve(&target)
    }

    /// Resolve a to-many relationship, skipping references that do not
    /// resolve.
    pub fn read_many<R: EntityKind>(&mut self, wire: &WireEntity, name: &str) -> Vec<Link<R>> {
        let targets: Vec<WireRef> = match wire.relationship(name) {
            Some(data) => data.refs().into_iter().cloned().collect(),
            None => return Vec::new(),
        };
        targets.iter().filter_map(|r| self.resolve(r)).collect()
    }

    /// Id of a to-one reference without resolving it.
    pub fn ref_id(&self, wire: &WireEntity, name: &str) -> Option<String> {
        match wire.relationship(name)? {
            RelationshipData::One(r) => Some(r.id.clone()),
            _ => None,
        }
    }

    fn resolve<R: EntityKind>(&mut self, target: &WireRef) -> Option<Link<R>> {
        if self.failure.is_some() {
            return None;
        }

        let descriptor = match self.registry.find_by_type::<R>() {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.failure = Some(err);
                return None;
            }
        };

        if target.kind != descriptor.logical_name() {
            tracing::warn!(
                wire_type = %target.kind,
                expected = descriptor.logical_name(),
                "relationship points at a different entity kind; ignoring"
            );
            return None;
        }

        let key = EntityKey::new(&target.kind, &target.id);
        if let Some(&slot) = self.index.get(&key) {
            return Some(Link::new(slot));
        }

        let Some(&wire) = self.pool.get(&key) else {
            tracing::debug!(wire_type = %key.kind, id = %key.id, "relationship not included");
            return None;
        };

        Some(Link::new(self.instantiate(&descriptor, Some(key), wire)))
    }

    fn instantiate(
        &mut self,
        descriptor: &EntityDescriptor,
        key: Option<EntityKey>,
        wire: &'a WireEntity,
    ) -> usize {
        let slot = self.slots.len();
        self.slots.push(None);
        if let Some(key) = key {
            self.index.insert(key, slot);
        }

        let entity = descriptor.construct(base_fields(wire), wire, self);
        self.slots[slot] = Some(entity);
        slot
    }

    fn primary(&mut self, descriptor: &EntityDescriptor, wire: &'a WireEntity) -> usize {
        let key = wire.id.as_ref().map(|id| EntityKey::new(&wire.kind, id));

        if let Some(key) = &key {
            if let Some(&slot) = self.index.get(key) {
                let same_kind = self.slots[slot]
                    .as_ref()
                    .is_some_and(|existing| descriptor.is_type_of(existing.as_ref()));
                if same_kind {
                    return slot;
                }
                return self.instantiate(descriptor, None, wire);
            }
        }

        self.instantiate(descriptor, key, wire)
    }

    fn finish(self) -> DataResult<EntityGraph> {
        if let Some(err) = self.failure {
            return Err(err);
        }

        let entities = self
            .slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| DataError::decode("hydration left an empty slot")))
            .collect::<DataResult<Vec<_>>>()?;

        Ok(EntityGraph::new(entities, self.index))
    }
}

/// Copy `createdAt`/`updatedAt` (attributes first, then meta) and the id.
fn base_fields(wire: &WireEntity) -> EntityBase {
    let timestamp = |name: &str| -> Option<DateTime<Utc>> {
        wire.attribute(name)
            .or_else(|| wire.meta_value(name))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };

    EntityBase::new(
        wire.id.clone(),
        timestamp("createdAt"),
        timestamp("updatedAt"),
    )
}

/// Turns documents into [`Node`]s using the shared registry.
#[derive(Debug, Clone)]
pub struct Hydrator {
    registry: Arc<TypeRegistry>,
}

impl Hydrator {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Hydrate singular primary data as `K`.
    pub fn hydrate_one<K: EntityKind>(&self, document: &Document) -> DataResult<Node<K>> {
        let wire = match &document.data {
            PrimaryData::One(wire) => wire.as_ref(),
            PrimaryData::Many(_) => {
                return Err(DataError::decode("expected a single resource, got a collection"));
            }
            PrimaryData::Null => return Err(DataError::decode("document has no primary data")),
        };

        let descriptor = self.registry.find_by_type::<K>()?;
        let mut pass = Hydration::new(&self.registry, document);
        let slot = pass.primary(&descriptor, wire);
        let graph = Arc::new(pass.finish()?);

        Node::try_new(graph, slot).ok_or_else(|| DataError::unknown_type(K::TYPE))
    }

    /// Hydrate collection primary data as `K`, in response order.
    ///
    /// Singular primary data is accepted as a collection of one; `null` as
    /// an empty collection.
    pub fn hydrate_many<K: EntityKind>(&self, document: &Document) -> DataResult<Vec<Node<K>>> {
        let wires: Vec<&WireEntity> = match &document.data {
            PrimaryData::Many(entities) => entities.iter().collect(),
            PrimaryData::One(wire) => vec![wire.as_ref()],
            PrimaryData::Null => return Ok(Vec::new()),
        };

        let descriptor = self.registry.find_by_type::<K>()?;
        let mut pass = Hydration::new(&self.registry, document);
        let slots: Vec<usize> = wires
            .into_iter()
            .map(|wire| pass.primary(&descriptor, wire))
            .collect();
        let graph = Arc::new(pass.finish()?);

        slots
            .into_iter()
            .map(|slot| {
                Node::try_new(Arc::clone(&graph), slot)
                    .ok_or_else(|| DataError::unknown_type(K::TYPE))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tenantkit_core::Entity;

    use super::*;
    use crate::testing::{Person, Team, registry};

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn hydrates_included_relationship() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({
            "data": {
                "type": "people", "id": "u1",
                "attributes": { "name": "Ann", "createdAt": "2024-03-01T10:00:00Z" },
                "relationships": { "team": { "data": { "type": "teams", "id": "t1" } } }
            },
            "included": [{ "type": "teams", "id": "t1", "attributes": { "title": "Acme" } }]
        }));

        let ann = hydrator.hydrate_one::<Person>(&document).unwrap();
        assert_eq!(ann.name().unwrap(), "Ann");
        assert_eq!(ann.base().id(), Some("u1"));
        assert_eq!(
            ann.base().created_at().unwrap().to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );

        let team = ann.related(ann.team()).unwrap();
        assert_eq!(team.title().unwrap(), "Acme");
    }

    #[test]
    fn cycles_terminate_and_share_instances() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({
            "data": {
                "type": "teams", "id": "t1",
                "attributes": { "title": "Core" },
                "relationships": { "members": { "data": [{ "type": "people", "id": "u1" }] } }
            },
            "included": [{
                "type": "people", "id": "u1",
                "attributes": { "name": "Ann" },
                "relationships": { "team": { "data": { "type": "teams", "id": "t1" } } }
            }]
        }));

        let team = hydrator.hydrate_one::<Team>(&document).unwrap();
        let members = team.related_all(team.members());
        assert_eq!(members.len(), 1);

        let back = members[0].related(members[0].team()).unwrap();
        assert!(Node::ptr_eq(&team, &back));
        assert_eq!(team.graph().len(), 2);
    }

    #[test]
    fn shared_references_hydrate_once() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({
            "data": [
                { "type": "people", "id": "u1", "attributes": { "name": "Ann" },
                  "relationships": { "team": { "data": { "type": "teams", "id": "t1" } } } },
                { "type": "people", "id": "u2", "attributes": { "name": "Bob" },
                  "relationships": { "team": { "data": { "type": "teams", "id": "t1" } } } }
            ],
            "included": [{ "type": "teams", "id": "t1", "attributes": { "title": "Core" } }]
        }));

        let people = hydrator.hydrate_many::<Person>(&document).unwrap();
        let a = people[0].related(people[0].team()).unwrap();
        let b = people[1].related(people[1].team()).unwrap();
        assert!(Node::ptr_eq(&a, &b));
        assert_eq!(people[1].name().unwrap(), "Bob");
    }

    #[test]
    fn absent_relationships_are_not_errors() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({
            "data": {
                "type": "people", "id": "u1",
                "attributes": {},
                "relationships": {
                    "team": { "data": { "type": "teams", "id": "missing" } },
                    "friends": { "data": [] }
                }
            }
        }));

        let person = hydrator.hydrate_one::<Person>(&document).unwrap();
        assert!(person.team().is_none());
        assert!(person.friends().is_empty());
        assert_eq!(
            person.name().unwrap_err(),
            DataError::missing_field("people", "name")
        );
        assert_eq!(
            person.require(person.team(), "team").unwrap_err(),
            DataError::missing_field("people", "team")
        );
    }

    #[test]
    fn foreign_reference_without_included_is_dropped() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({
            "data": {
                "type": "people", "id": "u1",
                "attributes": { "name": "Ann" },
                "relationships": { "team": { "data": { "type": "widgets", "id": "w1" } } }
            }
        }));

        let person = hydrator.hydrate_one::<Person>(&document).unwrap();
        assert!(person.team().is_none());
        assert_eq!(person.name().unwrap(), "Ann");
    }

    #[test]
    fn foreign_included_type_is_ignored() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({
            "data": {
                "type": "people", "id": "u1",
                "attributes": { "name": "Ann" },
                "relationships": { "team": { "data": { "type": "widgets", "id": "w1" } } }
            },
            "included": [{ "type": "widgets", "id": "w1", "attributes": {} }]
        }));

        let person = hydrator.hydrate_one::<Person>(&document).unwrap();
        assert!(person.team().is_none());
        assert_eq!(person.graph().len(), 1);
    }

    #[test]
    fn unregistered_related_kind_fails_the_pass() {
        let hydrator = Hydrator::new(Arc::new(TypeRegistry::new().with_kind::<Person>()));
        let document = doc(json!({
            "data": {
                "type": "people", "id": "u1",
                "attributes": { "name": "Ann" },
                "relationships": { "team": { "data": { "type": "teams", "id": "t1" } } }
            }
        }));

        assert!(matches!(
            hydrator.hydrate_one::<Person>(&document).unwrap_err(),
            DataError::UnknownType(_)
        ));
    }

    #[test]
    fn mismatched_relationship_kind_is_dropped() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({
            "data": {
                "type": "people", "id": "u1",
                "attributes": { "name": "Ann" },
                "relationships": { "team": { "data": { "type": "people", "id": "u2" } } }
            },
            "included": [{ "type": "people", "id": "u2", "attributes": { "name": "Bob" } }]
        }));

        let person = hydrator.hydrate_one::<Person>(&document).unwrap();
        assert!(person.team().is_none());
    }

    #[test]
    fn collection_shape_mismatch_is_reported() {
        let hydrator = Hydrator::new(registry());
        let document = doc(json!({ "data": [] }));
        assert!(hydrator.hydrate_one::<Person>(&document).is_err());
        assert!(hydrator.hydrate_many::<Person>(&document).unwrap().is_empty());
    }
}
