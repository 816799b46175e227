use serde::Serialize;

use tenantkit_core::{DataError, DataResult, Entity, EntityBase};
use tenantkit_data::{
    ApiClient, EntityDescriptor, EntityKind, Hydration, ListQuery, Node, Page, ResourceService,
    WireEntity, attributes_of,
};

/// A named bundle of capabilities assignable to users.
#[derive(Debug)]
pub struct Role {
    base: EntityBase,
    name: Option<String>,
    description: Option<String>,
    system: bool,
}

impl Role {
    pub fn name(&self) -> DataResult<&str> {
        self.name
            .as_deref()
            .ok_or(DataError::missing_field(Self::TYPE, "name"))
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Built-in roles cannot be deleted.
    pub fn is_system(&self) -> bool {
        self.system
    }
}

impl Entity for Role {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntityKind for Role {
    const TYPE: &'static str = "roles";
    type Input = RoleInput;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
            .display_name("Roles")
            .entity_id("role")
            .page_url("/roles")
    }

    fn rehydrate(base: EntityBase, wire: &WireEntity, _ctx: &mut Hydration<'_>) -> Self {
        Self {
            base,
            name: wire.attr_str("name"),
            description: wire.attr_str("description"),
            system: wire.attr_bool("system").unwrap_or(false),
        }
    }

    fn dehydrate(input: &RoleInput) -> DataResult<WireEntity> {
        let mut wire = WireEntity::new(Self::TYPE, None);
        wire.attributes = attributes_of(input)?;
        Ok(wire)
    }
}

#[derive(Debug, Clone)]
pub struct RoleService {
    roles: ResourceService<Role>,
}

impl RoleService {
    pub fn new(client: ApiClient) -> DataResult<Self> {
        Ok(Self {
            roles: ResourceService::new(client)?,
        })
    }

    pub fn roles(&self) -> &ResourceService<Role> {
        &self.roles
    }

    pub async fn list(&self, query: ListQuery) -> DataResult<Page<Node<Role>>> {
        self.roles.find_many(query).await
    }

    pub async fn create(&self, input: &RoleInput) -> DataResult<Node<Role>> {
        self.roles.create(input).await
    }

    /// Delete a custom role. System roles are refused locally.
    pub async fn delete(&self, role: &Node<Role>) -> DataResult<()> {
        if role.is_system() {
            return Err(DataError::unsupported(Role::TYPE, "delete system role"));
        }
        let id = role.id().ok_or(DataError::missing_field(Role::TYPE, "id"))?;
        self.roles.delete(id).await
    }
}
