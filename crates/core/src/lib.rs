//! `tenantkit-core`: shared building blocks for the data-access layer.
//!
//! This crate holds identifiers, the error taxonomy and the entity base; it
//! knows nothing about transport, wire formats or authorization.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, EntityBase};
pub use error::{DataError, DataResult};
pub use id::{CompanyId, UserId};
