//! Entity trait: identity + the base fields every hydrated record carries.

use chrono::{DateTime, Utc};

/// Fields shared by every hydrated entity.
///
/// Populated by the hydrator before the kind-specific rehydration runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityBase {
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl EntityBase {
    pub fn new(
        id: Option<String>,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            created_at,
            updated_at,
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Entity marker + minimal interface.
pub trait Entity {
    fn base(&self) -> &EntityBase;

    /// Server identifier; `None` only for records that were never persisted.
    fn id(&self) -> Option<&str> {
        self.base().id()
    }
}
