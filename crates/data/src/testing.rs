//! Small entity kinds used by this crate's unit tests.

use std::sync::Arc;

use serde::Serialize;

use tenantkit_auth::Feature;
use tenantkit_core::{DataError, DataResult, Entity, EntityBase};

use crate::dehydrate::{attributes_of, relate_one};
use crate::graph::Link;
use crate::hydrate::Hydration;
use crate::kind::EntityKind;
use crate::registry::{EntityDescriptor, ListInclusions, TypeRegistry};
use crate::wire::WireEntity;

#[derive(Debug)]
pub struct Person {
    base: EntityBase,
    name: Option<String>,
    email: Option<String>,
    active: Option<bool>,
    team: Option<Link<Team>>,
    friends: Vec<Link<Person>>,
}

impl Person {
    pub fn name(&self) -> DataResult<&str> {
        self.name
            .as_deref()
            .ok_or(DataError::missing_field(Self::TYPE, "name"))
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn active(&self) -> Option<bool> {
        self.active
    }

    pub fn team(&self) -> Option<Link<Team>> {
        self.team
    }

    pub fn friends(&self) -> &[Link<Person>] {
        &self.friends
    }
}

impl Entity for Person {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip)]
    pub team_id: Option<String>,
}

impl EntityKind for Person {
    const TYPE: &'static str = "people";
    type Input = PersonInput;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>().display_name("People")
    }

    fn rehydrate(base: EntityBase, wire: &WireEntity, ctx: &mut Hydration<'_>) -> Self {
        Self {
            base,
            name: wire.attr_str("name"),
            email: wire.attr_str("email"),
            active: wire.attr_bool("active"),
            team: ctx.read_one(wire, "team"),
            friends: ctx.read_many(wire, "friends"),
        }
    }

    fn dehydrate(input: &PersonInput) -> DataResult<WireEntity> {
        let mut wire = WireEntity::new(Self::TYPE, None);
        wire.attributes = attributes_of(input)?;
        relate_one(&mut wire, "team", Team::TYPE, input.team_id.as_deref());
        Ok(wire)
    }
}

#[derive(Debug)]
pub struct Team {
    base: EntityBase,
    title: Option<String>,
    members: Vec<Link<Person>>,
}

impl Team {
    pub fn title(&self) -> DataResult<&str> {
        self.title
            .as_deref()
            .ok_or(DataError::missing_field(Self::TYPE, "title"))
    }

    pub fn members(&self) -> &[Link<Person>] {
        &self.members
    }
}

impl Entity for Team {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

impl EntityKind for Team {
    const TYPE: &'static str = "teams";
    type Input = ();

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
            .display_name("Teams")
            .entity_id("team")
            .feature(Feature::new("teams"))
            .list_inclusions(
                ListInclusions::new()
                    .fields("teams", ["title"])
                    .fields("people", ["name", "email"])
                    .types(["teams", "people"]),
            )
    }

    fn rehydrate(base: EntityBase, wire: &WireEntity, ctx: &mut Hydration<'_>) -> Self {
        Self {
            base,
            title: wire.attr_str("title"),
            members: ctx.read_many(wire, "members"),
        }
    }
}

pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new().with_kind::<Person>().with_kind::<Team>())
}
