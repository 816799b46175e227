use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use tenantkit_auth::{Action, AuthzError, Decision, DenialKind, Module, Permissions};
use tenantkit_core::DataResult;
use tenantkit_data::{EntityKind, TypeRegistry};

use crate::context::permissions_from_headers;
use crate::errors::authz_error_to_response;

/// Decode the cookies once and make [`Permissions`] available to every
/// later layer and handler.
pub async fn permissions_middleware(mut req: Request<Body>, next: Next) -> Response {
    let permissions = permissions_from_headers(req.headers());
    tracing::debug!(
        user = ?permissions.actor().user_id,
        company = ?permissions.actor().company_id,
        "request permissions decoded"
    );
    req.extensions_mut().insert(permissions);
    next.run(req).await
}

/// What a blocked request gets back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OnDeny {
    /// `403` with a JSON body naming the denial.
    #[default]
    Forbidden,
    /// `303 See Other` to the given location (typically the dashboard).
    Redirect(String),
}

/// Module-level gate for a route tree.
///
/// Evaluated without a record. Ownership grants can only be settled against
/// the record itself, so a guard either blocks them (the default) or lets the
/// request through for the handler to check with
/// [`CurrentPermissions::authorize`](crate::CurrentPermissions::authorize).
#[derive(Debug, Clone)]
pub struct ModuleGuard {
    module: Module,
    action: Action,
    on_deny: OnDeny,
    defer_ownership: bool,
}

impl ModuleGuard {
    pub fn new(module: Module, action: Action) -> Self {
        Self {
            module,
            action,
            on_deny: OnDeny::Forbidden,
            defer_ownership: false,
        }
    }

    /// Guard the module registered for `K`.
    pub fn for_kind<K: EntityKind>(registry: &TypeRegistry, action: Action) -> DataResult<Self> {
        Ok(Self::new(registry.find_by_type::<K>()?.module(), action))
    }

    pub fn redirect_to(mut self, location: impl Into<String>) -> Self {
        self.on_deny = OnDeny::Redirect(location.into());
        self
    }

    pub fn defer_ownership(mut self) -> Self {
        self.defer_ownership = true;
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn check(&self, permissions: &Permissions) -> Decision {
        match permissions.decide::<serde_json::Value>(&self.module, self.action, None) {
            Decision::Denied(DenialKind::NoRecord) if self.defer_ownership => Decision::Allowed,
            decision => decision,
        }
    }

    fn deny(&self, reason: DenialKind) -> Response {
        match &self.on_deny {
            OnDeny::Forbidden => authz_error_to_response(AuthzError::PermissionDenied {
                module: self
                    .module
                    .entity_id
                    .clone()
                    .unwrap_or_else(|| "<none>".to_string()),
                action: self.action,
                reason,
            }),
            OnDeny::Redirect(location) => Redirect::to(location).into_response(),
        }
    }
}

pub async fn guard_middleware(
    State(guard): State<ModuleGuard>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let permissions = match req.extensions().get::<Permissions>() {
        Some(permissions) => permissions.clone(),
        None => permissions_from_headers(req.headers()),
    };

    match guard.check(&permissions) {
        Decision::Allowed => {
            req.extensions_mut().insert(permissions);
            next.run(req).await
        }
        Decision::Denied(reason) => {
            tracing::info!(
                module = ?guard.module.entity_id,
                action = %guard.action,
                %reason,
                path = %req.uri().path(),
                "request blocked"
            );
            guard.deny(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use tenantkit_auth::{Actor, CapabilityEntry, CapabilityTable, Feature, Grant};
    use tenantkit_core::UserId;

    use super::*;

    fn permissions(table: CapabilityTable) -> Permissions {
        Permissions::new(table, Actor::new(UserId::new("u1"), None))
    }

    #[test]
    fn ownership_grants_block_unless_deferred() {
        let table = CapabilityTable::empty().with_entry(
            "notification",
            CapabilityEntry::default().with(Action::Update, Grant::owned_by("userId")),
        );
        let guard = ModuleGuard::new(Module::new("notification"), Action::Update);

        assert_eq!(
            guard.check(&permissions(table.clone())),
            Decision::Denied(DenialKind::NoRecord)
        );
        assert_eq!(guard.defer_ownership().check(&permissions(table)), Decision::Allowed);
    }

    #[test]
    fn deferring_never_lifts_other_denials() {
        let guard = ModuleGuard::new(
            Module::new("billing").gated_by(Feature::new("billing")),
            Action::Read,
        )
        .defer_ownership();
        let table = CapabilityTable::empty().with_entry("billing", CapabilityEntry::full());

        assert_eq!(
            guard.check(&permissions(table)),
            Decision::Denied(DenialKind::FeatureDisabled)
        );
    }
}
