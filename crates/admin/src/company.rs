use serde::Serialize;

use tenantkit_core::{DataError, DataResult, Entity, EntityBase};
use tenantkit_data::{
    ApiClient, EntityDescriptor, EntityKind, Hydration, Link, ListQuery, Node, Page,
    ResourceService, WireEntity, attributes_of,
};

use crate::user::User;

/// A tenant.
#[derive(Debug)]
pub struct Company {
    base: EntityBase,
    name: Option<String>,
    slug: Option<String>,
    features: Vec<String>,
    users: Vec<Link<User>>,
}

impl Company {
    pub fn name(&self) -> DataResult<&str> {
        self.name
            .as_deref()
            .ok_or(DataError::missing_field(Self::TYPE, "name"))
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    /// Feature flags enabled for this tenant.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn users(&self) -> &[Link<User>] {
        &self.users
    }
}

impl Entity for Company {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl EntityKind for Company {
    const TYPE: &'static str = "companies";
    type Input = CompanyInput;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
            .display_name("Companies")
            .entity_id("company")
            .page_url("/companies")
    }

    fn rehydrate(base: EntityBase, wire: &WireEntity, ctx: &mut Hydration<'_>) -> Self {
        Self {
            base,
            name: wire.attr_str("name"),
            slug: wire.attr_str("slug"),
            features: wire.attr("features").unwrap_or_default(),
            users: ctx.read_many(wire, "users"),
        }
    }

    fn dehydrate(input: &CompanyInput) -> DataResult<WireEntity> {
        let mut wire = WireEntity::new(Self::TYPE, None);
        wire.attributes = attributes_of(input)?;
        Ok(wire)
    }
}

#[derive(Debug, Clone)]
pub struct CompanyService {
    companies: ResourceService<Company>,
}

impl CompanyService {
    pub fn new(client: ApiClient) -> DataResult<Self> {
        Ok(Self {
            companies: ResourceService::new(client)?,
        })
    }

    pub fn companies(&self) -> &ResourceService<Company> {
        &self.companies
    }

    pub async fn find(&self, id: &str) -> DataResult<Node<Company>> {
        self.companies.find(id).await
    }

    pub async fn rename(&self, id: &str, name: impl Into<String>) -> DataResult<Node<Company>> {
        let input = CompanyInput {
            name: Some(name.into()),
            ..Default::default()
        };
        self.companies.update(id, &input).await
    }

    /// Users of one company (`/companies/{id}/users`).
    pub async fn members(&self, company_id: &str, query: ListQuery) -> DataResult<Page<Node<User>>> {
        self.companies
            .find_children::<User>(company_id, "users", query)
            .await
    }
}
