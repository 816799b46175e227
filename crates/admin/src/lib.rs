//! `tenantkit-admin`: admin entity kinds and their feature services.
//!
//! Each module defines one kind (how it hydrates, what a write looks like)
//! plus the service the admin screens call. [`bootstrap`] registers them all.

pub mod access;
pub mod billing;
pub mod bootstrap;
pub mod company;
pub mod notification;
pub mod role;
pub mod user;

pub use billing::{BillingCustomer, BillingService};
pub use bootstrap::{AdminServices, register_all, registry};
pub use company::{Company, CompanyInput, CompanyService};
pub use notification::{Notification, NotificationInput, NotificationService, OWNER_FIELD};
pub use role::{Role, RoleInput, RoleService};
pub use user::{User, UserInput, UserService};
