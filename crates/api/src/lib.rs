//! Server-side permission guard.
//!
//! Decodes the same capability cookies the admin client reads and runs them
//! through the same evaluator, so a route blocked here is never offered there.

pub mod app;
pub mod context;
pub mod errors;
pub mod middleware;

pub use context::{CurrentPermissions, cookie_jar, permissions_from_headers};
pub use errors::{authz_error_to_response, data_error_to_response, json_error};
pub use middleware::{ModuleGuard, OnDeny, guard_middleware, permissions_middleware};
