//! Registry and service wiring for the admin client.

use std::sync::Arc;

use tenantkit_auth::{CookieSource, Permissions};
use tenantkit_core::DataResult;
use tenantkit_data::{ApiClient, ClientConfig, CookieSession, TypeRegistry};

use crate::{
    BillingCustomer, BillingService, Company, CompanyService, Notification, NotificationService,
    Role, RoleService, User, UserService,
};

/// Add every admin kind to `registry`.
pub fn register_all(registry: TypeRegistry) -> TypeRegistry {
    registry
        .with_kind::<Company>()
        .with_kind::<User>()
        .with_kind::<Role>()
        .with_kind::<Notification>()
        .with_kind::<BillingCustomer>()
}

/// Registry holding every admin kind.
pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(register_all(TypeRegistry::new()))
}

/// All feature services over one client.
#[derive(Debug, Clone)]
pub struct AdminServices {
    pub client: ApiClient,
    pub permissions: Permissions,
    pub companies: CompanyService,
    pub users: UserService,
    pub roles: RoleService,
    pub notifications: NotificationService,
    pub billing: BillingService,
}

impl AdminServices {
    pub fn new(client: ApiClient, permissions: Permissions) -> DataResult<Self> {
        Ok(Self {
            companies: CompanyService::new(client.clone())?,
            users: UserService::new(client.clone())?,
            roles: RoleService::new(client.clone())?,
            notifications: NotificationService::new(client.clone(), permissions.clone())?,
            billing: BillingService::new(client.clone())?,
            client,
            permissions,
        })
    }

    /// Wire the reqwest client from `config`, taking the session and the
    /// capability table from `cookies`.
    pub fn from_cookies<C>(config: ClientConfig, cookies: C) -> DataResult<Self>
    where
        C: CookieSource + Send + Sync + 'static,
    {
        let permissions = Permissions::from_cookies(&cookies);
        let session = Arc::new(CookieSession::new(cookies));
        let client = ApiClient::with_reqwest(config, registry(), session)?;
        tracing::debug!(
            user = ?permissions.actor().user_id,
            company = ?permissions.actor().company_id,
            "admin services ready"
        );
        Self::new(client, permissions)
    }
}
