//! `tenantkit-auth`: capability-table authorization shared by client and server.
//!
//! No HTTP or storage here: this crate decodes the
//! capability cookies and evaluates grants, nothing else.

pub mod authorize;
pub mod capability;
pub mod codec;
pub mod cookies;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthzError, Decision, DenialKind, Module, RecordFields, authorize, decide, evaluate,
};
pub use capability::{Action, CapabilityEntry, CapabilityRecord, CapabilityTable, Grant};
pub use codec::CodecError;
pub use cookies::{CookieJar, CookieSource};
pub use permissions::Permissions;
pub use principal::Actor;
pub use roles::{Feature, Role};
