use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tower::ServiceBuilder;

use tenantkit_auth::{Action, Decision, Feature, Role};
use tenantkit_data::TypeRegistry;

use crate::context::CurrentPermissions;
use crate::errors::data_error_to_response;
use crate::middleware::permissions_middleware;

/// Session introspection routes, with cookies decoded once per request.
///
/// The admin shell calls `/session/modules` to decide which screens to offer;
/// the answers come from the same evaluator every guard uses.
pub fn build_app(registry: Arc<TypeRegistry>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/session", get(session))
        .route("/session/modules", get(modules))
        .layer(
            ServiceBuilder::new()
                .layer(Extension(registry))
                .layer(from_fn(permissions_middleware)),
        )
}

async fn session(CurrentPermissions(permissions): CurrentPermissions) -> Json<Value> {
    let actor = permissions.actor();
    let mut roles: Vec<&str> = permissions.table().roles().map(Role::as_str).collect();
    roles.sort_unstable();
    let mut features: Vec<&str> = permissions.table().features().map(Feature::as_str).collect();
    features.sort_unstable();

    Json(json!({
        "user": actor.user_id.as_ref().map(|id| id.as_str()),
        "company": actor.company_id.as_ref().map(|id| id.as_str()),
        "roles": roles,
        "features": features,
        "capabilities": permissions.table().records(),
    }))
}

#[derive(Debug, Serialize)]
struct ModuleAccess {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    page: Option<String>,
    actions: Map<String, Value>,
}

async fn modules(
    Extension(registry): Extension<Arc<TypeRegistry>>,
    CurrentPermissions(permissions): CurrentPermissions,
) -> Response {
    let mut out = Vec::new();
    for name in registry.logical_names() {
        let descriptor = match registry.find_by_logical_name(name) {
            Ok(descriptor) => descriptor,
            Err(err) => return data_error_to_response(err),
        };
        let module = descriptor.module();

        let mut actions = Map::new();
        for action in Action::ALL {
            let decision: Decision = permissions.decide::<Value>(&module, action, None);
            actions.insert(action.to_string(), json!(decision));
        }

        out.push(ModuleAccess {
            kind: descriptor.logical_name().to_string(),
            name: descriptor.name().to_string(),
            page: descriptor.page().map(str::to_string),
            actions,
        });
    }
    Json(out).into_response()
}
