use tenantkit_auth::Feature;
use tenantkit_core::{DataResult, Entity, EntityBase};
use tenantkit_data::{
    ApiClient, EntityDescriptor, EntityKind, Hydration, ListQuery, Node, Page, ResourceService,
    WireEntity,
};

/// Customer record mirrored from the billing provider. Read-only.
#[derive(Debug)]
pub struct BillingCustomer {
    base: EntityBase,
    email: Option<String>,
    plan: Option<String>,
    status: Option<String>,
    balance_cents: Option<i64>,
}

impl BillingCustomer {
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn balance_cents(&self) -> i64 {
        self.balance_cents.unwrap_or(0)
    }
}

impl Entity for BillingCustomer {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

impl EntityKind for BillingCustomer {
    const TYPE: &'static str = "billing-customers";
    type Input = ();

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
            .display_name("Billing")
            .entity_id("billing")
            .feature(Feature::new("billing"))
            .page_url("/billing")
    }

    fn rehydrate(base: EntityBase, wire: &WireEntity, _ctx: &mut Hydration<'_>) -> Self {
        Self {
            base,
            email: wire.attr_str("email"),
            plan: wire.attr_str("plan"),
            status: wire.attr_str("status"),
            balance_cents: wire.attr_i64("balanceCents"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BillingService {
    customers: ResourceService<BillingCustomer>,
}

impl BillingService {
    pub fn new(client: ApiClient) -> DataResult<Self> {
        Ok(Self {
            customers: ResourceService::new(client)?,
        })
    }

    pub async fn customer(&self, id: &str) -> DataResult<Node<BillingCustomer>> {
        self.customers.find(id).await
    }

    pub async fn customers(&self, query: ListQuery) -> DataResult<Page<Node<BillingCustomer>>> {
        self.customers.find_many(query).await
    }
}
