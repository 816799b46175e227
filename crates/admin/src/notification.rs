use serde::Serialize;
use serde_json::{Value, json};

use tenantkit_auth::{Action, Decision, DenialKind, Feature, Module, Permissions, RecordFields};
use tenantkit_core::{DataError, DataResult, Entity, EntityBase};
use tenantkit_data::{
    ApiCall, ApiClient, EntityDescriptor, EntityKind, Hydration, Link, ListInclusions, ListQuery,
    Method, Node, Page, ResourceService, WireEntity, attributes_of, relate_one,
};

use crate::access;
use crate::user::User;

/// Record field naming a notification's recipient; ownership grants use it.
pub const OWNER_FIELD: &str = "userId";

#[derive(Debug)]
pub struct Notification {
    base: EntityBase,
    title: Option<String>,
    body: Option<String>,
    read: bool,
    user_id: Option<String>,
    user: Option<Link<User>>,
}

impl Notification {
    pub fn title(&self) -> DataResult<&str> {
        self.title
            .as_deref()
            .ok_or(DataError::missing_field(Self::TYPE, "title"))
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    /// Recipient id.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user(&self) -> Option<Link<User>> {
        self.user
    }
}

impl Entity for Notification {
    fn base(&self) -> &EntityBase {
        &self.base
    }
}

impl RecordFields for Notification {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id(),
            OWNER_FIELD => self.user_id(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(skip)]
    pub user_id: Option<String>,
}

impl EntityKind for Notification {
    const TYPE: &'static str = "notifications";
    type Input = NotificationInput;

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::of::<Self>()
            .display_name("Notifications")
            .entity_id("notification")
            .feature(Feature::new("notifications"))
            .list_inclusions(ListInclusions::new().fields("notifications", ["title", "read", "createdAt"]))
    }

    fn rehydrate(base: EntityBase, wire: &WireEntity, ctx: &mut Hydration<'_>) -> Self {
        Self {
            base,
            title: wire.attr_str("title"),
            body: wire.attr_str("body"),
            read: wire.attr_bool("read").unwrap_or(false),
            user_id: ctx.ref_id(wire, "user").or_else(|| wire.attr_str(OWNER_FIELD)),
            user: ctx.read_one(wire, "user"),
        }
    }

    fn dehydrate(input: &NotificationInput) -> DataResult<WireEntity> {
        let mut wire = WireEntity::new(Self::TYPE, None);
        wire.attributes = attributes_of(input)?;
        relate_one(&mut wire, "user", User::TYPE, input.user_id.as_deref());
        Ok(wire)
    }
}

/// Notification inbox of the acting user.
#[derive(Debug, Clone)]
pub struct NotificationService {
    notifications: ResourceService<Notification>,
    permissions: Permissions,
    module: Module,
}

impl NotificationService {
    pub fn new(client: ApiClient, permissions: Permissions) -> DataResult<Self> {
        let module = access::module_for::<Notification>(client.registry())?;
        Ok(Self {
            notifications: ResourceService::new(client)?,
            permissions,
            module,
        })
    }

    pub fn notifications(&self) -> &ResourceService<Notification> {
        &self.notifications
    }

    /// Unread notifications, newest first.
    pub async fn unread(&self, mut query: ListQuery) -> DataResult<Page<Node<Notification>>> {
        query.params.push(("filter[read]".to_string(), "false".to_string()));
        query.params.push(("sort".to_string(), "-createdAt".to_string()));
        self.notifications.find_many(query).await
    }

    /// Mark one notification read. Only its recipient may do so when the
    /// capability table grants `update` by ownership.
    pub async fn mark_read(&self, notification: &Node<Notification>) -> DataResult<Node<Notification>> {
        access::ensure(&self.permissions, &self.module, Action::Update, Some(&**notification))?;
        let id = notification
            .id()
            .ok_or(DataError::missing_field(Notification::TYPE, "id"))?;
        let input = NotificationInput {
            read: Some(true),
            ..Default::default()
        };
        self.notifications.update(id, &input).await
    }

    /// Mark every listed notification read in one batch call.
    ///
    /// The batch endpoint takes a bare id list, so the payload skips
    /// dehydration. Ownership grants cannot be checked without the records;
    /// the server settles those per id.
    pub async fn mark_all_read(&self, ids: &[String]) -> DataResult<()> {
        match self.permissions.decide::<Value>(&self.module, Action::Update, None) {
            Decision::Allowed | Decision::Denied(DenialKind::NoRecord) => {}
            Decision::Denied(reason) => {
                return Err(DataError::permission_denied(format!(
                    "update on '{}' ({reason})",
                    Notification::TYPE
                )));
            }
        }
        let mut endpoint = self.notifications.endpoint();
        endpoint.id("read");
        let call = ApiCall::<Notification>::new(Method::Post, endpoint).with_raw(json!({ "ids": ids }));
        self.notifications.client().call_api(call).await?;
        Ok(())
    }
}
