//! `tenantkit-data`: generic data-access layer.
//!
//! Wire documents go in through the [`Hydrator`] and come out as typed
//! [`Node`]s; write intents go out through the [`Dehydrator`]. Both consult
//! the [`TypeRegistry`] built at bootstrap. [`ApiClient`] ties them to an
//! [`HttpTransport`], and [`DataListRetriever`] drives paginated list views.

pub mod config;
pub mod cursor;
pub mod dehydrate;
pub mod endpoint;
pub mod graph;
pub mod hydrate;
pub mod kind;
pub mod list;
pub mod registry;
pub mod service;
pub mod transport;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use cursor::{Cursor, Page, PageCursor};
pub use dehydrate::{Dehydrator, attributes_of, relate_many, relate_one};
pub use endpoint::{EndpointBuilder, EndpointSpec};
pub use graph::{AnyEntity, EntityGraph, EntityKey, Link, Node};
pub use hydrate::{Hydration, Hydrator};
pub use kind::EntityKind;
pub use list::{
    DataListRetriever, ListItem, ListQuery, ListSource, ListState, ListStatus, Paging,
    ResponseOrdering,
};
pub use registry::{EntityDescriptor, EntityFactory, FieldSelector, ListInclusions, TypeRegistry};
pub use service::{ApiCall, ApiClient, Hydrated, Payload, ResourceService};
pub use transport::{
    CookieSession, HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, Session,
    SessionProvider, StaticSession,
};
pub use wire::{
    Cursors, Document, DocumentMeta, ErrorBody, PrimaryData, Relationship, RelationshipData,
    WireEntity, WirePayload, WireRef,
};
