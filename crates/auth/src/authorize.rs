use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use tenantkit_core::UserId;

use crate::{Action, CapabilityTable, Feature, Grant};

/// Authorization coordinates of a module (an entity kind or screen).
///
/// `entity_id` selects the capability entry; `feature` optionally gates the
/// whole module behind a tenant feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Module {
    pub entity_id: Option<String>,
    pub feature: Option<Feature>,
}

impl Module {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            feature: None,
        }
    }

    pub fn gated_by(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }
}

/// Field lookup on a target record, used by ownership grants.
pub trait RecordFields {
    fn field(&self, name: &str) -> Option<&str>;
}

impl RecordFields for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(serde_json::Value::as_str)
    }
}

impl RecordFields for serde_json::Value {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(serde_json::Value::as_str)
    }
}

impl RecordFields for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<T: RecordFields + ?Sized> RecordFields for &T {
    fn field(&self, name: &str) -> Option<&str> {
        (**self).field(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("permission denied: {action} on '{module}' ({reason})")]
    PermissionDenied {
        module: String,
        action: crate::Action,
        reason: DenialKind,
    },
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    FeatureDisabled,
    NoCapabilityEntry,
    ExplicitDeny,
    NoRecord,
    NotOwner,
}

impl core::fmt::Display for DenialKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            DenialKind::FeatureDisabled => "feature disabled",
            DenialKind::NoCapabilityEntry => "no capability entry",
            DenialKind::ExplicitDeny => "denied",
            DenialKind::NoRecord => "ownership grant without record",
            DenialKind::NotOwner => "not the owner",
        };
        f.write_str(text)
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Denied(DenialKind),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Decide an action on a module, explaining the outcome.
///
/// - No IO
/// - No panics
/// - Same result on every runtime for the same inputs
pub fn decide<R>(
    table: &CapabilityTable,
    module: &Module,
    action: Action,
    acting_user: Option<&UserId>,
    record: Option<&R>,
) -> Decision
where
    R: RecordFields + ?Sized,
{
    if let Some(feature) = &module.feature {
        if !table.has_feature(feature) {
            return Decision::Denied(DenialKind::FeatureDisabled);
        }
    }

    let Some(entry) = module.entity_id.as_deref().and_then(|id| table.entry(id)) else {
        return Decision::Denied(DenialKind::NoCapabilityEntry);
    };

    match entry.grant(action) {
        Grant::Allow => Decision::Allowed,
        Grant::Deny => Decision::Denied(DenialKind::ExplicitDeny),
        Grant::OwnedBy(field) => {
            let Some(record) = record else {
                return Decision::Denied(DenialKind::NoRecord);
            };
            match (record.field(field), acting_user) {
                (Some(owner), Some(user)) if owner == user.as_str() => Decision::Allowed,
                _ => Decision::Denied(DenialKind::NotOwner),
            }
        }
    }
}

/// Boolean form of [`decide`].
pub fn evaluate<R>(
    table: &CapabilityTable,
    module: &Module,
    action: Action,
    acting_user: Option<&UserId>,
    record: Option<&R>,
) -> bool
where
    R: RecordFields + ?Sized,
{
    decide(table, module, action, acting_user, record).is_allowed()
}

/// [`decide`], mapped onto `AuthzError` for guard-style callers.
pub fn authorize<R>(
    table: &CapabilityTable,
    module: &Module,
    action: Action,
    acting_user: Option<&UserId>,
    record: Option<&R>,
) -> Result<(), AuthzError>
where
    R: RecordFields + ?Sized,
{
    match decide(table, module, action, acting_user, record) {
        Decision::Allowed => Ok(()),
        Decision::Denied(reason) => Err(AuthzError::PermissionDenied {
            module: module.entity_id.clone().unwrap_or_default(),
            action,
            reason,
        }),
    }
}
