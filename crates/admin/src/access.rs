//! Client-side permission checks against registered kinds.

use tenantkit_auth::{Action, Module, Permissions, RecordFields};
use tenantkit_core::{DataError, DataResult};
use tenantkit_data::{EntityKind, TypeRegistry};

/// Authorization coordinates registered for `K`.
pub fn module_for<K: EntityKind>(registry: &TypeRegistry) -> DataResult<Module> {
    Ok(registry.find_by_type::<K>()?.module())
}

/// Fail with `PermissionDenied` unless `action` is allowed.
pub fn ensure<R: RecordFields + ?Sized>(
    permissions: &Permissions,
    module: &Module,
    action: Action,
    record: Option<&R>,
) -> DataResult<()> {
    permissions
        .require(module, action, record)
        .map_err(|err| DataError::permission_denied(err.to_string()))
}

/// Boolean check for UI code deciding what to show.
pub fn can<K: EntityKind + RecordFields>(
    permissions: &Permissions,
    registry: &TypeRegistry,
    action: Action,
    record: Option<&K>,
) -> bool {
    match module_for::<K>(registry) {
        Ok(module) => permissions.can(&module, action, record),
        Err(err) => {
            tracing::warn!(entity_type = K::TYPE, error = %err, "permission check on unregistered kind");
            false
        }
    }
}
