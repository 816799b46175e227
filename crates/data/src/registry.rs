//! Type registry: logical entity name / Rust type → descriptor.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use tenantkit_auth::{Feature, Module};
use tenantkit_core::{DataError, DataResult, EntityBase};

use crate::graph::AnyEntity;
use crate::hydrate::Hydration;
use crate::kind::EntityKind;
use crate::wire::WireEntity;

/// Constructor stored in a descriptor.
pub type EntityFactory = fn(EntityBase, &WireEntity, &mut Hydration<'_>) -> Box<dyn AnyEntity>;

fn construct<K: EntityKind>(
    base: EntityBase,
    wire: &WireEntity,
    ctx: &mut Hydration<'_>,
) -> Box<dyn AnyEntity> {
    Box::new(K::rehydrate(base, wire, ctx))
}

/// Attribute whitelist for one type in list queries (`fields[<type>]=...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    pub kind: String,
    pub fields: Vec<String>,
}

impl FieldSelector {
    pub fn new<S: Into<String>>(kind: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            kind: kind.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Sparse fieldsets and type restriction applied when listing a kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListInclusions {
    pub fields: Vec<FieldSelector>,
    pub types: Vec<String>,
}

impl ListInclusions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<S: Into<String>>(
        mut self,
        kind: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.fields.push(FieldSelector::new(kind, fields));
        self
    }

    pub fn types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }
}

/// Everything the data layer knows about one entity kind.
///
/// Immutable once registered.
#[derive(Clone)]
pub struct EntityDescriptor {
    logical_name: String,
    display_name: String,
    entity_id: Option<String>,
    page_url: Option<String>,
    feature: Option<Feature>,
    list_inclusions: Option<ListInclusions>,
    type_id: TypeId,
    rust_type: &'static str,
    factory: EntityFactory,
}

impl EntityDescriptor {
    /// Descriptor for `K` under its default logical name.
    pub fn of<K: EntityKind>() -> Self {
        Self {
            logical_name: K::TYPE.to_string(),
            display_name: K::TYPE.to_string(),
            entity_id: None,
            page_url: None,
            feature: None,
            list_inclusions: None,
            type_id: TypeId::of::<K>(),
            rust_type: type_name::<K>(),
            factory: construct::<K>,
        }
    }

    /// Register under a different logical name.
    pub fn named(mut self, logical_name: impl Into<String>) -> Self {
        self.logical_name = logical_name.into();
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn list_inclusions(mut self, inclusions: ListInclusions) -> Self {
        self.list_inclusions = Some(inclusions);
        self
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }

    pub fn capability_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn page(&self) -> Option<&str> {
        self.page_url.as_deref()
    }

    pub fn required_feature(&self) -> Option<&Feature> {
        self.feature.as_ref()
    }

    pub fn inclusions(&self) -> Option<&ListInclusions> {
        self.list_inclusions.as_ref()
    }

    /// Authorization coordinates for this kind.
    pub fn module(&self) -> Module {
        Module {
            entity_id: self.entity_id.clone(),
            feature: self.feature.clone(),
        }
    }

    /// True when this descriptor constructs `K`.
    pub fn is<K: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<K>()
    }

    /// True when `entity` was constructed by this descriptor's kind.
    pub fn is_type_of(&self, entity: &dyn AnyEntity) -> bool {
        Any::type_id(entity.as_any()) == self.type_id
    }

    pub(crate) fn construct(
        &self,
        base: EntityBase,
        wire: &WireEntity,
        ctx: &mut Hydration<'_>,
    ) -> Box<dyn AnyEntity> {
        (self.factory)(base, wire, ctx)
    }
}

impl core::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("logical_name", &self.logical_name)
            .field("display_name", &self.display_name)
            .field("entity_id", &self.entity_id)
            .field("page_url", &self.page_url)
            .field("feature", &self.feature)
            .field("list_inclusions", &self.list_inclusions)
            .field("rust_type", &self.rust_type)
            .finish()
    }
}

/// Registry of entity descriptors.
///
/// Built once at bootstrap, then shared read-only as `Arc<TypeRegistry>` with
/// the hydrator, dehydrator and endpoint builder.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: HashMap<String, Arc<EntityDescriptor>>,
    by_type: HashMap<TypeId, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning the one it replaced.
    ///
    /// Registering an existing logical name overrides it (last writer wins).
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Option<Arc<EntityDescriptor>> {
        let name = descriptor.logical_name.clone();
        self.by_type.insert(descriptor.type_id, name.clone());
        let previous = self.by_name.insert(name.clone(), Arc::new(descriptor));
        if let Some(previous) = &previous {
            tracing::debug!(
                logical_name = %name,
                replaced = previous.rust_type,
                "entity descriptor overridden"
            );
        }
        previous
    }

    /// Register `K` with its own descriptor.
    pub fn register_kind<K: EntityKind>(&mut self) -> Option<Arc<EntityDescriptor>> {
        self.register(K::descriptor())
    }

    /// Chaining form of [`register_kind`](Self::register_kind) for bootstrap code.
    pub fn with_kind<K: EntityKind>(mut self) -> Self {
        self.register_kind::<K>();
        self
    }

    pub fn find_by_logical_name(&self, name: &str) -> DataResult<Arc<EntityDescriptor>> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| DataError::unknown_type(name))
    }

    /// Look a descriptor up by the Rust type it constructs.
    pub fn find_by_type<K: 'static>(&self) -> DataResult<Arc<EntityDescriptor>> {
        self.by_type
            .get(&TypeId::of::<K>())
            .and_then(|name| self.by_name.get(name))
            .filter(|descriptor| descriptor.is::<K>())
            .cloned()
            .ok_or_else(|| DataError::unknown_type(type_name::<K>()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered logical names, sorted.
    pub fn logical_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Person, Team};

    #[test]
    fn lookup_by_name_and_type() {
        let registry = TypeRegistry::new().with_kind::<Person>().with_kind::<Team>();

        assert_eq!(registry.find_by_logical_name("people").unwrap().name(), "People");
        assert_eq!(registry.find_by_type::<Team>().unwrap().logical_name(), "teams");
        assert_eq!(registry.logical_names(), vec!["people", "teams"]);
    }

    #[test]
    fn missing_kind_fails_fast() {
        let registry = TypeRegistry::new().with_kind::<Person>();

        assert_eq!(
            registry.find_by_logical_name("teams").unwrap_err(),
            DataError::unknown_type("teams")
        );
        assert!(matches!(
            registry.find_by_type::<Team>(),
            Err(DataError::UnknownType(_))
        ));
    }

    #[test]
    fn later_registration_overrides() {
        let mut registry = TypeRegistry::new().with_kind::<Person>();
        let previous = registry.register(Person::descriptor().display_name("Members"));

        assert_eq!(previous.unwrap().name(), "People");
        assert_eq!(registry.find_by_logical_name("people").unwrap().name(), "Members");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn override_with_another_kind_orphans_the_old_type() {
        let mut registry = TypeRegistry::new().with_kind::<Person>();
        registry.register(Team::descriptor().named("people"));

        assert!(registry.find_by_logical_name("people").unwrap().is::<Team>());
        assert!(registry.find_by_type::<Person>().is_err());
        assert_eq!(registry.find_by_type::<Team>().unwrap().logical_name(), "people");
    }

    #[test]
    fn descriptor_exposes_module_gate() {
        let registry = TypeRegistry::new().with_kind::<Team>();
        let module = registry.find_by_type::<Team>().unwrap().module();

        assert_eq!(module.entity_id.as_deref(), Some("team"));
        assert_eq!(module.feature, Some(Feature::new("teams")));
    }
}
