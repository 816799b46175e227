//! Hydrated entity graph.
//!
//! One hydration pass produces one [`EntityGraph`]: an arena of entities keyed
//! by `(type, id)`. Entities refer to each other through typed [`Link`]s
//! (arena slots), so cyclic responses need no reference cycles. Callers hold
//! [`Node`]s, which pair the shared graph with a slot and dereference to the
//! entity.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use tenantkit_auth::RecordFields;
use tenantkit_core::{DataError, DataResult, Entity, EntityBase};

use crate::kind::EntityKind;

/// Identity of a resource within one response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: String,
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Object-safe view of any hydrated entity.
pub trait AnyEntity: Any + Send + Sync + core::fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn entity_base(&self) -> &EntityBase;
    fn kind_name(&self) -> &'static str;
}

impl<K: EntityKind> AnyEntity for K {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn entity_base(&self) -> &EntityBase {
        self.base()
    }

    fn kind_name(&self) -> &'static str {
        K::TYPE
    }
}

/// Arena of entities produced by one hydration pass.
#[derive(Debug)]
pub struct EntityGraph {
    entities: Vec<Box<dyn AnyEntity>>,
    index: HashMap<EntityKey, usize>,
}

impl EntityGraph {
    pub(crate) fn new(entities: Vec<Box<dyn AnyEntity>>, index: HashMap<EntityKey, usize>) -> Self {
        Self { entities, index }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.index.contains_key(key)
    }

    fn get<K: EntityKind>(&self, slot: usize) -> Option<&K> {
        self.entities.get(slot)?.as_any().downcast_ref::<K>()
    }

    /// Node for the entity stored under `key`, if it is a `K`.
    pub fn node<K: EntityKind>(self: &Arc<Self>, key: &EntityKey) -> Option<Node<K>> {
        let slot = *self.index.get(key)?;
        Node::try_new(Arc::clone(self), slot)
    }
}

/// Typed reference from one entity to another within the same graph.
pub struct Link<K> {
    slot: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Link<K> {
    pub(crate) fn new(slot: usize) -> Self {
        Self {
            slot,
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for Link<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Link<K> {}

impl<K> PartialEq for Link<K> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<K> Eq for Link<K> {}

impl<K> core::fmt::Debug for Link<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Link({})", self.slot)
    }
}

/// Handle to a hydrated entity; dereferences to `K`.
///
/// Holds its graph alive. Two nodes from the same response are
/// [`ptr_eq`](Node::ptr_eq) when they denote the same `(type, id)`.
pub struct Node<K> {
    graph: Arc<EntityGraph>,
    slot: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K: EntityKind> Node<K> {
    /// Invariant: a `Node<K>` only exists for a slot holding a `K`.
    pub(crate) fn try_new(graph: Arc<EntityGraph>, slot: usize) -> Option<Self> {
        graph.get::<K>(slot)?;
        Some(Self {
            graph,
            slot,
            _kind: PhantomData,
        })
    }

    pub fn graph(&self) -> &Arc<EntityGraph> {
        &self.graph
    }

    /// Same entity of the same response.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.graph, &b.graph) && a.slot == b.slot
    }

    /// Follow an optional to-one relationship.
    pub fn related<R: EntityKind>(&self, link: Option<Link<R>>) -> Option<Node<R>> {
        Node::try_new(Arc::clone(&self.graph), link?.slot)
    }

    /// Follow a to-many relationship.
    pub fn related_all<R: EntityKind>(&self, links: &[Link<R>]) -> Vec<Node<R>> {
        links
            .iter()
            .filter_map(|link| Node::try_new(Arc::clone(&self.graph), link.slot))
            .collect()
    }

    /// Follow a relationship the caller requires to be present.
    pub fn require<R: EntityKind>(
        &self,
        link: Option<Link<R>>,
        field: &'static str,
    ) -> DataResult<Node<R>> {
        self.related(link)
            .ok_or_else(|| DataError::missing_field(K::TYPE, field))
    }
}

impl<K: EntityKind> Deref for Node<K> {
    type Target = K;

    fn deref(&self) -> &K {
        self.graph
            .get::<K>(self.slot)
            .expect("node slot holds the kind it was created for")
    }
}

impl<K> Clone for Node<K> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            slot: self.slot,
            _kind: PhantomData,
        }
    }
}

impl<K: EntityKind> core::fmt::Debug for Node<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&**self, f)
    }
}

impl<K: EntityKind + RecordFields> RecordFields for Node<K> {
    fn field(&self, name: &str) -> Option<&str> {
        (**self).field(name)
    }
}
