//! API client and the generic resource service built on it.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use tenantkit_core::{DataError, DataResult};

use crate::config::ClientConfig;
use crate::cursor::{Page, PageCursor};
use crate::dehydrate::Dehydrator;
use crate::endpoint::EndpointBuilder;
use crate::graph::Node;
use crate::hydrate::Hydrator;
use crate::kind::EntityKind;
use crate::list::{ListQuery, ListSource};
use crate::registry::TypeRegistry;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, SessionProvider};
use crate::wire::{Document, ErrorBody, PrimaryData};

/// Query parameter carrying a list search term.
pub const SEARCH_PARAM: &str = "search";

/// Request body of an [`ApiCall`].
pub enum Payload<'a, K: EntityKind> {
    None,
    /// Dehydrated through `K` before sending.
    Entity(&'a K::Input),
    /// Sent as-is, for endpoints whose body is not entity-shaped.
    Raw(Value),
}

/// One call through [`ApiClient::call_api`].
pub struct ApiCall<'a, K: EntityKind> {
    pub method: Method,
    pub endpoint: EndpointBuilder,
    pub payload: Payload<'a, K>,
    pub cursor: Option<PageCursor>,
}

impl<'a, K: EntityKind> ApiCall<'a, K> {
    pub fn new(method: Method, endpoint: EndpointBuilder) -> Self {
        Self {
            method,
            endpoint,
            payload: Payload::None,
            cursor: None,
        }
    }

    pub fn get(endpoint: EndpointBuilder) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn with_input(mut self, input: &'a K::Input) -> Self {
        self.payload = Payload::Entity(input);
        self
    }

    pub fn with_raw(mut self, body: Value) -> Self {
        self.payload = Payload::Raw(body);
        self
    }

    pub fn with_cursor(mut self, cursor: Option<PageCursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Hydrated response of a call.
#[derive(Debug)]
pub enum Hydrated<K: EntityKind> {
    One(Node<K>),
    Many(Page<Node<K>>),
    /// `204` or an empty body.
    Empty,
}

impl<K: EntityKind> Hydrated<K> {
    pub fn into_one(self) -> DataResult<Node<K>> {
        match self {
            Hydrated::One(node) => Ok(node),
            Hydrated::Many(_) => Err(DataError::decode(format!(
                "expected a single '{}', got a collection",
                K::TYPE
            ))),
            Hydrated::Empty => Err(DataError::decode(format!(
                "expected a single '{}', got an empty response",
                K::TYPE
            ))),
        }
    }

    /// Collections as-is; a single resource as a page of one.
    pub fn into_page(self) -> Page<Node<K>> {
        match self {
            Hydrated::One(node) => Page::new(vec![node]),
            Hydrated::Many(page) => page,
            Hydrated::Empty => Page::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Hydrated::Empty)
    }
}

/// Authenticated, tenant-scoped access to the backend.
///
/// No call is ever retried here.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    registry: Arc<TypeRegistry>,
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionProvider>,
    hydrator: Hydrator,
    dehydrator: Dehydrator,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        registry: Arc<TypeRegistry>,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            hydrator: Hydrator::new(Arc::clone(&registry)),
            dehydrator: Dehydrator::new(Arc::clone(&registry)),
            registry,
            transport,
            session,
        }
    }

    /// Client over the shipped `reqwest` transport.
    pub fn with_reqwest(
        config: ClientConfig,
        registry: Arc<TypeRegistry>,
        session: Arc<dyn SessionProvider>,
    ) -> DataResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::new(config, registry, transport, session))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn endpoint(&self, resource: impl Into<String>) -> EndpointBuilder {
        EndpointBuilder::new(Arc::clone(&self.registry), resource)
    }

    pub async fn call_api<K: EntityKind>(&self, call: ApiCall<'_, K>) -> DataResult<Hydrated<K>> {
        let ApiCall {
            method,
            mut endpoint,
            payload,
            cursor,
        } = call;

        if cursor.is_some() {
            endpoint.cursor(cursor);
        }

        let body = match payload {
            Payload::None => None,
            Payload::Raw(body) => Some(body),
            Payload::Entity(input) if method.carries_payload() => {
                let wire = self
                    .dehydrator
                    .to_wire_for::<K>(endpoint.spec().id.as_deref(), input)?;
                Some(serde_json::to_value(wire)?)
            }
            Payload::Entity(_) => {
                tracing::warn!(%method, entity_type = K::TYPE, "entity payload ignored for method");
                None
            }
        };

        let request = HttpRequest {
            method,
            url: self.config.url_for(&endpoint.generate()),
            headers: self.headers(),
            body,
        };
        tracing::debug!(%method, url = %request.url, "api call");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let err = api_error(response);
            tracing::debug!(error = %err, "api call failed");
            return Err(err);
        }
        if response.status == 204 || response.body.trim().is_empty() {
            return Ok(Hydrated::Empty);
        }

        let document: Document = serde_json::from_str(&response.body)?;
        match &document.data {
            PrimaryData::Null => Ok(Hydrated::Empty),
            PrimaryData::One(_) => Ok(Hydrated::One(self.hydrator.hydrate_one::<K>(&document)?)),
            PrimaryData::Many(_) => {
                let items = self.hydrator.hydrate_many::<K>(&document)?;
                Ok(Hydrated::Many(Page {
                    items,
                    next: document.meta.cursors.next.clone(),
                    previous: document.meta.cursors.previous.clone(),
                    total: document.meta.total,
                }))
            }
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        let session = self.session.session();
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(token) = session.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        if let Some(company) = session.company_id {
            headers.push((self.config.company_header.clone(), company.into()));
        }
        headers
    }
}

impl core::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Server message from an error body, falling back to the raw body.
fn api_error(response: HttpResponse) -> DataError {
    let message = serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            let body = response.body.trim();
            if body.is_empty() {
                format!("request failed with status {}", response.status)
            } else {
                body.to_string()
            }
        });
    DataError::api(response.status, message)
}

/// CRUD over one registered kind.
pub struct ResourceService<K> {
    client: ApiClient,
    resource: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for ResourceService<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            resource: self.resource.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> core::fmt::Debug for ResourceService<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceService")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl<K: EntityKind> ResourceService<K> {
    /// Service rooted at `K`'s registered logical name.
    pub fn new(client: ApiClient) -> DataResult<Self> {
        let resource = client.registry().find_by_type::<K>()?.logical_name().to_string();
        Ok(Self::with_resource(client, resource))
    }

    /// Service for `K` served under a different path segment.
    pub fn with_resource(client: ApiClient, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into(),
            _kind: PhantomData,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn endpoint(&self) -> EndpointBuilder {
        self.client.endpoint(self.resource.clone())
    }

    pub async fn find(&self, id: &str) -> DataResult<Node<K>> {
        let mut endpoint = self.endpoint();
        endpoint.id(id);
        self.client
            .call_api::<K>(ApiCall::get(endpoint))
            .await?
            .into_one()
    }

    pub async fn find_many(&self, query: ListQuery) -> DataResult<Page<Node<K>>> {
        let descriptor = self.client.registry().find_by_type::<K>()?;
        let mut endpoint = self.endpoint();
        endpoint.list_of(descriptor.logical_name());
        apply_query(&mut endpoint, &query);
        let call = ApiCall::get(endpoint).with_cursor(query.cursor);
        Ok(self.client.call_api::<K>(call).await?.into_page())
    }

    /// List `/{resource}/{id}/{child}` as `C`.
    pub async fn find_children<C: EntityKind>(
        &self,
        id: &str,
        child: &str,
        query: ListQuery,
    ) -> DataResult<Page<Node<C>>> {
        let descriptor = self.client.registry().find_by_type::<C>()?;
        let mut endpoint = self.endpoint();
        endpoint.id(id).child(child).list_of(descriptor.logical_name());
        apply_query(&mut endpoint, &query);
        let call = ApiCall::get(endpoint).with_cursor(query.cursor);
        Ok(self.client.call_api::<C>(call).await?.into_page())
    }

    pub async fn create(&self, input: &K::Input) -> DataResult<Node<K>> {
        let call = ApiCall::new(Method::Post, self.endpoint()).with_input(input);
        self.client.call_api::<K>(call).await?.into_one()
    }

    pub async fn update(&self, id: &str, input: &K::Input) -> DataResult<Node<K>> {
        let mut endpoint = self.endpoint();
        endpoint.id(id);
        let call = ApiCall::new(Method::Patch, endpoint).with_input(input);
        self.client.call_api::<K>(call).await?.into_one()
    }

    pub async fn delete(&self, id: &str) -> DataResult<()> {
        let mut endpoint = self.endpoint();
        endpoint.id(id);
        self.client
            .call_api::<K>(ApiCall::new(Method::Delete, endpoint))
            .await?;
        Ok(())
    }
}

fn apply_query(endpoint: &mut EndpointBuilder, query: &ListQuery) {
    if !query.search_term.is_empty() {
        endpoint.param(SEARCH_PARAM, query.search_term.clone());
    }
    for (key, value) in &query.params {
        endpoint.param(key.clone(), value.clone());
    }
}

#[async_trait]
impl<K: EntityKind> ListSource<Node<K>> for ResourceService<K> {
    async fn fetch(&self, query: ListQuery) -> DataResult<Page<Node<K>>> {
        self.find_many(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::json;
    use tenantkit_core::{CompanyId, Entity};

    use super::*;
    use crate::list::{DataListRetriever, ListStatus, Paging};
    use crate::testing::{Person, PersonInput, Team, registry};
    use crate::transport::{Session, StaticSession};

    #[derive(Default)]
    struct MockTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        fn replying(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request(&self, index: usize) -> HttpRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: HttpRequest) -> DataResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| DataError::transport("no response queued"))
        }
    }

    fn ok(body: Value) -> HttpResponse {
        HttpResponse::new(200, body.to_string())
    }

    fn client(transport: Arc<MockTransport>) -> ApiClient {
        let session = StaticSession(Session::new("tok", Some(CompanyId::new("c1"))));
        ApiClient::new(
            ClientConfig::new("http://api.test/"),
            registry(),
            transport,
            Arc::new(session),
        )
    }

    #[tokio::test]
    async fn find_sends_session_headers_and_hydrates() -> anyhow::Result<()> {
        let transport = MockTransport::replying(vec![ok(json!({
            "data": {
                "type": "people", "id": "u1",
                "attributes": { "name": "Ann" },
                "relationships": { "team": { "data": { "type": "teams", "id": "t1" } } }
            },
            "included": [{ "type": "teams", "id": "t1", "attributes": { "title": "Acme" } }]
        }))]);
        let people = ResourceService::<Person>::new(client(transport.clone()))?;

        let ann = people.find("u1").await?;
        assert_eq!(ann.name()?, "Ann");
        assert_eq!(ann.require(ann.team(), "team")?.title()?, "Acme");

        let request = transport.request(0);
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "http://api.test/people/u1");
        assert_eq!(request.header("authorization"), Some("Bearer tok"));
        assert_eq!(request.header("X-Company-Id"), Some("c1"));
        assert_eq!(request.body, None);
        Ok(())
    }

    #[tokio::test]
    async fn renamed_kinds_keep_their_list_inclusions() {
        let transport = MockTransport::replying(vec![ok(json!({ "data": [] }))]);
        let mut registry = TypeRegistry::new();
        registry.register(Team::descriptor().named("squads"));
        let client = ApiClient::new(
            ClientConfig::new("http://api.test"),
            Arc::new(registry),
            transport.clone(),
            Arc::new(StaticSession(Session::anonymous())),
        );
        let squads = ResourceService::<Team>::new(client).unwrap();

        assert!(squads.find_many(ListQuery::default()).await.unwrap().is_empty());
        assert_eq!(
            transport.request(0).url,
            "http://api.test/squads?fields[teams]=title&fields[people]=name,email&types=teams,people"
        );
    }

    #[tokio::test]
    async fn non_success_carries_server_message() {
        let transport = MockTransport::replying(vec![
            HttpResponse::new(
                422,
                json!({ "ok": false, "status": 422, "error": "name is taken" }).to_string(),
            ),
            HttpResponse::new(502, "Bad Gateway"),
        ]);
        let people = ResourceService::<Person>::new(client(transport)).unwrap();

        assert_eq!(
            people.create(&PersonInput::default()).await.unwrap_err(),
            DataError::api(422, "name is taken")
        );
        assert_eq!(
            people.find("u1").await.unwrap_err(),
            DataError::api(502, "Bad Gateway")
        );
    }

    #[tokio::test]
    async fn collections_carry_cursors_and_follow_them() {
        let transport = MockTransport::replying(vec![
            ok(json!({
                "data": [
                    { "type": "teams", "id": "t1", "attributes": { "title": "Core" } },
                    { "type": "teams", "id": "t2", "attributes": { "title": "Edge" } }
                ],
                "meta": { "cursors": { "next": "abc" }, "total": 3 }
            })),
            ok(json!({ "data": [{ "type": "teams", "id": "t3", "attributes": { "title": "Ops" } }] })),
        ]);
        let teams = ResourceService::<Team>::new(client(transport.clone())).unwrap();

        let first = teams.find_many(ListQuery::default()).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.total, Some(3));
        assert_eq!(first.items[1].title().unwrap(), "Edge");

        let query = ListQuery {
            search_term: "o p".into(),
            cursor: first.next.clone().map(PageCursor::Next),
            ..Default::default()
        };
        let second = teams.find_many(query).await.unwrap();
        assert!(!second.has_next());

        assert_eq!(
            transport.request(0).url,
            "http://api.test/teams?fields[teams]=title&fields[people]=name,email&types=teams,people"
        );
        assert!(transport.request(1).url.ends_with("&search=o+p&next=abc"));
    }

    #[tokio::test]
    async fn writes_dehydrate_unless_raw() {
        let transport = MockTransport::replying(vec![
            ok(json!({ "data": { "type": "people", "id": "u9", "attributes": { "name": "Cy" } } })),
            ok(json!({ "data": { "type": "people", "id": "u9", "attributes": { "active": false } } })),
            HttpResponse::new(204, ""),
            HttpResponse::new(200, ""),
        ]);
        let api = client(transport.clone());
        let people = ResourceService::<Person>::new(api.clone()).unwrap();

        let created = people
            .create(&PersonInput {
                name: Some("Cy".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.base().id(), Some("u9"));
        assert_eq!(
            transport.request(0).body,
            Some(json!({ "data": { "type": "people", "attributes": { "name": "Cy" } } }))
        );

        let updated = people
            .update("u9", &PersonInput {
                active: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.active(), Some(false));
        let patch = transport.request(1);
        assert_eq!(patch.method, Method::Patch);
        assert_eq!(
            patch.body,
            Some(json!({ "data": { "type": "people", "id": "u9", "attributes": { "active": false } } }))
        );

        people.delete("u9").await.unwrap();
        assert_eq!(transport.request(2).url, "http://api.test/people/u9");

        let mut endpoint = api.endpoint("people");
        endpoint.id("batch");
        let raw = ApiCall::<Person>::new(Method::Post, endpoint).with_raw(json!({ "ids": ["u1"] }));
        assert!(api.call_api(raw).await.unwrap().is_empty());
        assert_eq!(transport.request(3).body, Some(json!({ "ids": ["u1"] })));
    }

    #[tokio::test]
    async fn read_only_kind_cannot_be_created() {
        let transport = MockTransport::replying(Vec::new());
        let teams = ResourceService::<Team>::new(client(transport.clone())).unwrap();

        assert_eq!(
            teams.create(&()).await.unwrap_err(),
            DataError::unsupported("teams", "dehydrate")
        );
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn service_drives_a_list_view() {
        let transport = MockTransport::replying(vec![ok(json!({
            "data": [{ "type": "people", "id": "u1", "attributes": { "name": "Ann" } }],
            "meta": { "total": 1 }
        }))]);
        let people = ResourceService::<Person>::new(client(transport)).unwrap();
        let list = DataListRetriever::<Node<Person>>::new(Arc::new(people));

        list.set_ready(true).await.unwrap();
        assert_eq!(list.status(), ListStatus::Loaded);
        assert_eq!(list.data()[0].name().unwrap(), "Ann");

        assert!(list.remove_element("u1"));
        assert_eq!(list.total(), Some(0));
        list.next(Paging::Append).await.unwrap();
        assert!(list.data().is_empty());
    }
}
