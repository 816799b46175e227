//! HTTP transport and session seams.

use async_trait::async_trait;
use serde_json::Value;

use tenantkit_auth::CookieSource;
use tenantkit_auth::cookies::{COMPANY_COOKIE, SESSION_COOKIE};
use tenantkit_core::{CompanyId, DataError, DataResult};

use crate::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Methods whose body is an entity payload.
    pub fn carries_payload(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl core::fmt::Display for Method {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request. Implementations never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> DataResult<HttpResponse>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> DataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DataError::transport(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> DataResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DataError::transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| DataError::transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Credentials attached to every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub company_id: Option<CompanyId>,
}

impl Session {
    pub fn new(token: impl Into<String>, company_id: Option<CompanyId>) -> Self {
        Self {
            token: Some(token.into()),
            company_id,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Source of the ambient session.
pub trait SessionProvider: Send + Sync {
    fn session(&self) -> Session;
}

/// Fixed session, for services and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(pub Session);

impl SessionProvider for StaticSession {
    fn session(&self) -> Session {
        self.0.clone()
    }
}

/// Session read from the `session` / `company` cookies on every call.
#[derive(Debug, Clone)]
pub struct CookieSession<C> {
    cookies: C,
}

impl<C> CookieSession<C> {
    pub fn new(cookies: C) -> Self {
        Self { cookies }
    }
}

impl<C: CookieSource + Send + Sync> SessionProvider for CookieSession<C> {
    fn session(&self) -> Session {
        Session {
            token: self.cookies.cookie(SESSION_COOKIE).filter(|t| !t.is_empty()),
            company_id: self
                .cookies
                .cookie(COMPANY_COOKIE)
                .and_then(|v| v.parse::<CompanyId>().ok()),
        }
    }
}
