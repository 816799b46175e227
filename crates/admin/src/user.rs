use serde::Serialize;

use tenantkit_auth::RecordFields;
use tenantkit_core::{DataError, DataResult, Entity, EntityBase};
use tenantkit_data::{
    ApiClient, EntityDescriptor, EntityKind, Hydration, Link, ListInclusions, ListQuery, Node,
    Page, ResourceService, WireEntity, attributes_of, relate_many, relate_one,
};

use crate::company::Company;
use crate::role::Role;

/// A member of a company.
#[derive(Debug)]
pub struct User {
    base: EntityBase,
    name: Option<String>,
    email: Option<String>,
    active: Option<bool>,
    company_id: Option<String>,
    company: Option<Link<Company>>,
    roles: Vec<Link<Role>>,
}

impl User {
    pub fn name(&self) -> DataResult<&str> {
        self.name
            .as_deref()
            .ok_or(DataError::missing_field(Self::TYPE, "name"))
    }

    pub fn email(&self) -> DataResult<&str> {
        self.email
            .as_deref()
            .ok_or(DataError::missing_field(Self::TYPE, "email"))
    }

    /// Users are active unless the server says otherwise.
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    /// Id of the owning company, even when it was not included.
    pub fn company_id(&self) -> Option<&str> {
        self.company_id.as_deref()
    }

    pub fn company(&self) -> Option<Link<Company>> {
        self.company
    }

    pub fn roles(&self) -> &[Link<Role>] {
        &self.roles
    }
}

impl Entity for User {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

impl RecordFields for User {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" | "userId" => self.id(),
            "companyId" => self.company_id(),
            "email" => self.email.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip)]
    pub company_id: Option<String>,
    #[serde(skip)]
    pub role_ids: Option<Vec<String>>,
}

impl EntityKind for User {
    const TYPE: &'static str = "users";
    type Input = UserInput;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
            .display_name("Users")
            .entity_id("user")
            .page_url("/users")
            .list_inclusions(
                ListInclusions::new()
                    .fields("users", ["name", "email", "active"])
                    .fields("roles", ["name"]),
            )
    }

    fn rehydrate(base: EntityBase, wire: &WireEntity, ctx: &mut Hydration<'_>) -> Self {
        Self {
            base,
            name: wire.attr_str("name"),
            email: wire.attr_str("email"),
            active: wire.attr_bool("active"),
            company_id: ctx.ref_id(wire, "company"),
            company: ctx.read_one(wire, "company"),
            roles: ctx.read_many(wire, "roles"),
        }
    }

    fn dehydrate(input: &UserInput) -> DataResult<WireEntity> {
        let mut wire = WireEntity::new(Self::TYPE, None);
        wire.attributes = attributes_of(input)?;
        relate_one(&mut wire, "company", Company::TYPE, input.company_id.as_deref());
        relate_many(&mut wire, "roles", Role::TYPE, input.role_ids.as_deref());
        Ok(wire)
    }
}

#[derive(Debug, Clone)]
pub struct UserService {
    users: ResourceService<User>,
}

impl UserService {
    pub fn new(client: ApiClient) -> DataResult<Self> {
        Ok(Self {
            users: ResourceService::new(client)?,
        })
    }

    pub fn users(&self) -> &ResourceService<User> {
        &self.users
    }

    pub async fn find(&self, id: &str) -> DataResult<Node<User>> {
        self.users.find(id).await
    }

    pub async fn list(&self, query: ListQuery) -> DataResult<Page<Node<User>>> {
        self.users.find_many(query).await
    }

    pub async fn invite(&self, input: &UserInput) -> DataResult<Node<User>> {
        self.users.create(input).await
    }

    pub async fn update(&self, id: &str, input: &UserInput) -> DataResult<Node<User>> {
        self.users.update(id, input).await
    }

    pub async fn remove(&self, id: &str) -> DataResult<()> {
        self.users.delete(id).await
    }

    /// Roles granted to one user (`/users/{id}/roles`).
    pub async fn roles(&self, user_id: &str, query: ListQuery) -> DataResult<Page<Node<Role>>> {
        self.users.find_children::<Role>(user_id, "roles", query).await
    }

    /// Replace the user's roles. An empty list revokes all of them.
    pub async fn assign_roles(&self, user_id: &str, role_ids: Vec<String>) -> DataResult<Node<User>> {
        let input = UserInput {
            role_ids: Some(role_ids),
            ..Default::default()
        };
        self.users.update(user_id, &input).await
    }
}
