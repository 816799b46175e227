use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use axum::response::Response;

use tenantkit_auth::{Action, Actor, CookieJar, Module, Permissions, RecordFields};

use crate::errors::authz_error_to_response;

/// Cookies sent with a request, across every `Cookie` header.
pub fn cookie_jar(headers: &HeaderMap) -> CookieJar {
    CookieJar::parse_all(
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    )
}

/// Decode the request's capability and session cookies (fails closed).
pub fn permissions_from_headers(headers: &HeaderMap) -> Permissions {
    Permissions::from_cookies(&cookie_jar(headers))
}

/// Permissions of the current request.
///
/// Taken from the request extensions when the permissions middleware ran,
/// decoded from the cookies otherwise. Never rejects: a request without
/// cookies simply gets the deny-all table.
#[derive(Debug, Clone)]
pub struct CurrentPermissions(pub Permissions);

impl CurrentPermissions {
    pub fn actor(&self) -> &Actor {
        self.0.actor()
    }

    /// Record-level check for handlers; denial becomes a `403` response.
    pub fn authorize<R: RecordFields + ?Sized>(
        &self,
        module: &Module,
        action: Action,
        record: Option<&R>,
    ) -> Result<(), Response> {
        self.0
            .require(module, action, record)
            .map_err(authz_error_to_response)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentPermissions
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(permissions) = parts.extensions.get::<Permissions>() {
            return Ok(Self(permissions.clone()));
        }
        Ok(Self(permissions_from_headers(&parts.headers)))
    }
}
