//! Endpoint builder: resource paths, sparse fieldsets and cursor parameters.

use std::sync::Arc;

use url::form_urlencoded;

use tenantkit_core::DataResult;

use crate::cursor::{Cursor, PageCursor};
use crate::kind::EntityKind;
use crate::registry::{FieldSelector, ListInclusions, TypeRegistry};

/// Everything needed to render one request target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSpec {
    pub resource: String,
    pub id: Option<String>,
    pub child: Option<String>,
    pub child_id: Option<String>,
    /// Caller-defined parameters, in insertion order.
    pub params: Vec<(String, String)>,
    pub field_limits: Vec<FieldSelector>,
    pub type_limits: Vec<String>,
    pub list_of: Option<String>,
    pub cursor: Option<PageCursor>,
}

/// Fluent builder over an [`EndpointSpec`].
///
/// Mutators change the builder in place and return it for chaining;
/// [`generate`](Self::generate) only reads.
#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    registry: Arc<TypeRegistry>,
    spec: EndpointSpec,
    inclusions: Option<ListInclusions>,
}

impl EndpointBuilder {
    pub fn new(registry: Arc<TypeRegistry>, resource: impl Into<String>) -> Self {
        Self {
            registry,
            spec: EndpointSpec {
                resource: resource.into(),
                ..Default::default()
            },
            inclusions: None,
        }
    }

    /// Builder rooted at the logical name registered for `K`.
    pub fn for_kind<K: EntityKind>(registry: Arc<TypeRegistry>) -> DataResult<Self> {
        let resource = registry.find_by_type::<K>()?.logical_name().to_string();
        Ok(Self::new(registry, resource))
    }

    pub fn id(&mut self, id: impl Into<String>) -> &mut Self {
        self.spec.id = Some(id.into());
        self
    }

    /// Nest a child collection under the current id. Ignored without an id.
    pub fn child(&mut self, resource: impl Into<String>) -> &mut Self {
        let resource = resource.into();
        if self.spec.id.is_none() {
            tracing::warn!(child = %resource, "child resource without a parent id; ignored");
            return self;
        }
        self.spec.child = Some(resource);
        self
    }

    /// Ignored unless a child resource is set.
    pub fn child_id(&mut self, id: impl Into<String>) -> &mut Self {
        if self.spec.child.is_none() {
            return self;
        }
        self.spec.child_id = Some(id.into());
        self
    }

    /// Set a query parameter. An existing key keeps its position and takes
    /// the new value.
    pub fn param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.spec.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.spec.params.push((key, value)),
        }
        self
    }

    pub fn remove_param(&mut self, key: &str) -> &mut Self {
        self.spec.params.retain(|(k, _)| k != key);
        self
    }

    /// Restrict the attributes returned for `kind`. Overrides the registry
    /// whitelist for that type.
    pub fn limit_fields<S: Into<String>>(
        &mut self,
        kind: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        let selector = FieldSelector::new(kind, fields);
        upsert_selector(&mut self.spec.field_limits, selector);
        self
    }

    pub fn limit_types<S: Into<String>>(&mut self, types: impl IntoIterator<Item = S>) -> &mut Self {
        self.spec.type_limits = types.into_iter().map(Into::into).collect();
        self
    }

    /// Apply the list inclusions registered for `logical_name`.
    ///
    /// A name without a descriptor is remembered but contributes nothing.
    pub fn list_of(&mut self, logical_name: impl Into<String>) -> &mut Self {
        let name = logical_name.into();
        self.inclusions = match self.registry.find_by_logical_name(&name) {
            Ok(descriptor) => descriptor.inclusions().cloned(),
            Err(err) => {
                tracing::warn!(logical_name = %name, error = %err, "list_of names an unregistered type");
                None
            }
        };
        self.spec.list_of = Some(name);
        self
    }

    pub fn next(&mut self, cursor: Cursor) -> &mut Self {
        self.cursor(Some(PageCursor::Next(cursor)))
    }

    pub fn previous(&mut self, cursor: Cursor) -> &mut Self {
        self.cursor(Some(PageCursor::Previous(cursor)))
    }

    pub fn cursor(&mut self, cursor: Option<PageCursor>) -> &mut Self {
        self.spec.cursor = cursor;
        self
    }

    pub fn clear_cursor(&mut self) -> &mut Self {
        self.cursor(None)
    }

    pub fn spec(&self) -> &EndpointSpec {
        &self.spec
    }

    /// `/{resource}[/{id}[/{child}[/{child_id}]]]`.
    ///
    /// The child segments are only emitted under an id.
    pub fn path(&self) -> String {
        let spec = &self.spec;
        let mut path = format!("/{}", encode_segment(&spec.resource));
        if let Some(id) = &spec.id {
            path.push('/');
            path.push_str(&encode_segment(id));
            if let Some(child) = &spec.child {
                path.push('/');
                path.push_str(&encode_segment(child));
                if let Some(child_id) = &spec.child_id {
                    path.push('/');
                    path.push_str(&encode_segment(child_id));
                }
            }
        }
        path
    }

    /// Ordered query pairs, values already encoded.
    fn query(&self) -> Vec<String> {
        let spec = &self.spec;
        let mut pairs = Vec::new();

        let mut selectors = self
            .inclusions
            .as_ref()
            .map(|inc| inc.fields.clone())
            .unwrap_or_default();
        for selector in &spec.field_limits {
            upsert_selector(&mut selectors, selector.clone());
        }
        for selector in selectors.iter().filter(|s| !s.fields.is_empty()) {
            pairs.push(format!(
                "fields[{}]={}",
                encode(&selector.kind),
                encode_list(&selector.fields)
            ));
        }

        let types = if spec.type_limits.is_empty() {
            self.inclusions
                .as_ref()
                .map(|inc| inc.types.as_slice())
                .unwrap_or_default()
        } else {
            spec.type_limits.as_slice()
        };
        if !types.is_empty() {
            pairs.push(format!("types={}", encode_list(types)));
        }

        for (key, value) in &spec.params {
            pairs.push(format!("{}={}", encode(key), encode(value)));
        }

        if let Some(cursor) = &spec.cursor {
            pairs.push(format!(
                "{}={}",
                cursor.param_name(),
                encode(cursor.cursor().as_str())
            ));
        }

        pairs
    }

    /// Render path and query string. Pure; repeated calls agree.
    pub fn generate(&self) -> String {
        let path = self.path();
        let query = self.query();
        if query.is_empty() {
            path
        } else {
            format!("{path}?{}", query.join("&"))
        }
    }
}

fn upsert_selector(selectors: &mut Vec<FieldSelector>, selector: FieldSelector) {
    match selectors.iter_mut().find(|s| s.kind == selector.kind) {
        Some(existing) => *existing = selector,
        None => selectors.push(selector),
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn encode_list(values: &[String]) -> String {
    values.iter().map(|v| encode(v)).collect::<Vec<_>>().join(",")
}

fn encode_segment(value: &str) -> String {
    encode(value).replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Person, Team, registry};

    fn cursor(token: &str) -> Cursor {
        serde_json::from_value(serde_json::json!(token)).unwrap()
    }

    #[test]
    fn child_path_has_no_trailing_question_mark() {
        let mut builder = EndpointBuilder::new(registry(), "users");
        builder.id("u1").child("roles");
        assert_eq!(builder.generate(), "/users/u1/roles");
    }

    #[test]
    fn child_without_parent_id_is_ignored() {
        let mut builder = EndpointBuilder::new(registry(), "users");
        builder.child("roles").child_id("r1");
        assert_eq!(builder.generate(), "/users");
        assert_eq!(builder.spec().child, None);
        assert_eq!(builder.spec().child_id, None);

        builder.id("u1").child_id("r1");
        assert_eq!(builder.spec().child_id, None);
        builder.child("roles").child_id("r1");
        assert_eq!(builder.generate(), "/users/u1/roles/r1");
    }

    #[test]
    fn generate_is_idempotent() {
        let mut builder = EndpointBuilder::for_kind::<Team>(registry()).unwrap();
        builder.list_of("teams").param("q", "a b").next(cursor("c1"));

        let first = builder.generate();
        assert_eq!(first, builder.generate());
        assert_eq!(builder.spec().resource, "teams");
    }

    #[test]
    fn query_order_is_fields_types_params_cursor() {
        let mut builder = EndpointBuilder::new(registry(), "teams");
        builder
            .param("sort", "-createdAt")
            .list_of("teams")
            .limit_fields("people", ["name"])
            .param("filter[active]", "true")
            .previous(cursor("p/1"));

        assert_eq!(
            builder.generate(),
            "/teams?fields[teams]=title&fields[people]=name&types=teams,people\
             &sort=-createdAt&filter%5Bactive%5D=true&previous=p%2F1"
        );
    }

    #[test]
    fn explicit_limits_and_types_win() {
        let mut builder = EndpointBuilder::new(registry(), "teams");
        builder
            .list_of("teams")
            .limit_fields("teams", ["title", "createdAt"])
            .limit_types(["teams"]);

        assert_eq!(
            builder.generate(),
            "/teams?fields[teams]=title,createdAt&fields[people]=name,email&types=teams"
        );
    }

    #[test]
    fn kinds_without_inclusions_add_nothing() {
        let mut builder = EndpointBuilder::for_kind::<Person>(registry()).unwrap();
        builder.list_of("people").list_of("widgets");
        assert_eq!(builder.generate(), "/people");
    }

    #[test]
    fn params_replace_in_place_and_cursor_clears() {
        let mut builder = EndpointBuilder::new(registry(), "users");
        builder
            .param("a", "1")
            .param("b", "2")
            .param("a", "3")
            .next(cursor("n"))
            .clear_cursor();
        assert_eq!(builder.generate(), "/users?a=3&b=2");

        builder.remove_param("a");
        assert_eq!(builder.generate(), "/users?b=2");
    }

    #[test]
    fn path_segments_are_encoded() {
        let mut builder = EndpointBuilder::new(registry(), "files");
        builder.id("a b/c");
        assert_eq!(builder.path(), "/files/a%20b%2Fc");
    }
}
