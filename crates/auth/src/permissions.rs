//! Permission hook: decoded capability table + acting user.
//!
//! The browser-side hook and the server-side guard both build a
//! [`Permissions`] from cookies and ask it the same questions. Only the
//! `CookieSource` differs.

use crate::authorize::{self, AuthzError, Decision, Module, RecordFields};
use crate::cookies::{ACCESS_COOKIE, CAPABILITIES_COOKIE, CookieSource};
use crate::{Action, Actor, CapabilityTable, Feature, Role, codec};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Permissions {
    table: CapabilityTable,
    actor: Actor,
}

impl Permissions {
    pub fn new(table: CapabilityTable, actor: Actor) -> Self {
        Self { table, actor }
    }

    /// Decode the capability and session cookies (fails closed).
    pub fn from_cookies(cookies: &impl CookieSource) -> Self {
        let capabilities = cookies.cookie(CAPABILITIES_COOKIE);
        let access = cookies.cookie(ACCESS_COOKIE);
        Self {
            table: codec::decode_table(capabilities.as_deref(), access.as_deref()),
            actor: Actor::from_cookies(cookies),
        }
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.table
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn decide<R: RecordFields + ?Sized>(
        &self,
        module: &Module,
        action: Action,
        record: Option<&R>,
    ) -> Decision {
        authorize::decide(
            &self.table,
            module,
            action,
            self.actor.user_id.as_ref(),
            record,
        )
    }

    /// Whether `action` is allowed on `record` (or on the module, if `None`).
    pub fn can<R: RecordFields + ?Sized>(
        &self,
        module: &Module,
        action: Action,
        record: Option<&R>,
    ) -> bool {
        self.decide(module, action, record).is_allowed()
    }

    /// Module-level check, for actions without a target record.
    pub fn can_on_module(&self, module: &Module, action: Action) -> bool {
        self.can::<serde_json::Value>(module, action, None)
    }

    pub fn require<R: RecordFields + ?Sized>(
        &self,
        module: &Module,
        action: Action,
        record: Option<&R>,
    ) -> Result<(), AuthzError> {
        authorize::authorize(
            &self.table,
            module,
            action,
            self.actor.user_id.as_ref(),
            record,
        )
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.table.has_role(role)
    }

    pub fn has_feature(&self, feature: &Feature) -> bool {
        self.table.has_feature(feature)
    }
}
