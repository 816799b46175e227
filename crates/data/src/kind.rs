//! Entity kinds: the compile-time half of the type registry.

use tenantkit_core::{DataError, DataResult, Entity, EntityBase};

use crate::hydrate::Hydration;
use crate::registry::EntityDescriptor;
use crate::wire::WireEntity;

/// A concrete entity kind known at compile time.
///
/// Each kind names its default wire `type`, knows how to read itself out of a
/// wire resource (`rehydrate`), and optionally how to turn a write intent back
/// into one (`dehydrate`). Kinds are registered with a
/// [`TypeRegistry`](crate::TypeRegistry) at bootstrap; the runtime registry
/// is what the hydrator consults for relationship targets.
pub trait EntityKind: Entity + core::fmt::Debug + Send + Sync + Sized + 'static {
    /// Default logical name (wire `type`).
    const TYPE: &'static str;

    /// Plain write-intent accepted by [`dehydrate`](Self::dehydrate).
    ///
    /// Read-only projections use `()`.
    type Input: Send + Sync;

    /// Descriptor registered for this kind. Override to add an entity id,
    /// feature gate, page URL or list inclusions.
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
    }

    /// Build the entity from `wire`. Relationship reads go through `ctx` and
    /// never fail; required fields that are absent stay unset and fail on
    /// first read instead.
    fn rehydrate(base: EntityBase, wire: &WireEntity, ctx: &mut Hydration<'_>) -> Self;

    /// Map a write intent to `attributes`/`relationships`.
    ///
    /// Only fields present on `input` are emitted. `type` and `id` are filled
    /// in by the [`Dehydrator`](crate::Dehydrator).
    fn dehydrate(input: &Self::Input) -> DataResult<WireEntity> {
        let _ = input;
        Err(DataError::unsupported(Self::TYPE, "dehydrate"))
    }
}
