//! Capability table: per-module CRUD grants plus the tenant's roles and features.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Feature, Role};

/// The four actions a capability entry grants or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grant for a single action.
///
/// On the wire a grant is either a boolean or the name of an ownership field
/// (`"userId"`): the action is allowed only on records whose field equals the
/// acting user's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Grant {
    Allow,
    #[default]
    Deny,
    OwnedBy(String),
}

impl Grant {
    pub fn owned_by(field: impl Into<String>) -> Self {
        Self::OwnedBy(field.into())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawGrant {
    Flag(bool),
    Field(String),
}

impl Serialize for Grant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            Grant::Allow => RawGrant::Flag(true),
            Grant::Deny => RawGrant::Flag(false),
            Grant::OwnedBy(field) => RawGrant::Field(field.clone()),
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Grant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawGrant::deserialize(deserializer)? {
            RawGrant::Flag(true) => Grant::Allow,
            RawGrant::Flag(false) => Grant::Deny,
            RawGrant::Field(field) => Grant::OwnedBy(field),
        })
    }
}

/// CRUD grants for one module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityEntry {
    #[serde(default)]
    pub create: Grant,
    #[serde(default)]
    pub read: Grant,
    #[serde(default)]
    pub update: Grant,
    #[serde(default)]
    pub delete: Grant,
}

impl CapabilityEntry {
    /// Entry granting every action.
    pub fn full() -> Self {
        Self {
            create: Grant::Allow,
            read: Grant::Allow,
            update: Grant::Allow,
            delete: Grant::Allow,
        }
    }

    pub fn grant(&self, action: Action) -> &Grant {
        match action {
            Action::Create => &self.create,
            Action::Read => &self.read,
            Action::Update => &self.update,
            Action::Delete => &self.delete,
        }
    }

    pub fn with(mut self, action: Action, grant: Grant) -> Self {
        match action {
            Action::Create => self.create = grant,
            Action::Read => self.read = grant,
            Action::Update => self.update = grant,
            Action::Delete => self.delete = grant,
        }
        self
    }
}

/// Wire form of one capability entry: `{ id, permissions: {...} }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRecord {
    pub id: String,
    pub permissions: CapabilityEntry,
}

/// Decoded capability table.
///
/// Replaced wholesale on login, token refresh, or role/feature/company change;
/// never merged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilityTable {
    entries: HashMap<String, CapabilityEntry>,
    features: HashSet<Feature>,
    roles: HashSet<Role>,
}

impl CapabilityTable {
    /// The deny-all table used when nothing (valid) was decoded.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = CapabilityRecord>) -> Self {
        Self {
            entries: records.into_iter().map(|r| (r.id, r.permissions)).collect(),
            ..Default::default()
        }
    }

    pub fn with_entry(mut self, entity_id: impl Into<String>, entry: CapabilityEntry) -> Self {
        self.entries.insert(entity_id.into(), entry);
        self
    }

    pub fn with_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn entry(&self, entity_id: &str) -> Option<&CapabilityEntry> {
        self.entries.get(entity_id)
    }

    pub fn has_feature(&self, feature: &Feature) -> bool {
        self.features.contains(feature)
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.features.is_empty() && self.roles.is_empty()
    }

    /// Entries in wire form, sorted by id for stable encoding.
    pub fn records(&self) -> Vec<CapabilityRecord> {
        let mut records: Vec<CapabilityRecord> = self
            .entries
            .iter()
            .map(|(id, permissions)| CapabilityRecord {
                id: id.clone(),
                permissions: permissions.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}
