//! Cookie encoding of the capability table.
//!
//! `capabilities` cookie: base64 of `[FORMAT_VERSION] ++ gzip(json)`, where the
//! JSON is an array of [`CapabilityRecord`]. `access` cookie:
//! `"<role>,<role>|<feature>,<feature>"`.
//!
//! Both runtimes (client and trusted server) decode through [`decode_table`],
//! which fails closed: anything it cannot read becomes the empty, deny-all
//! table.

use std::io::{Read, Write};

use base64::prelude::*;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use thiserror::Error;

use crate::{CapabilityRecord, CapabilityTable, Feature, Role};

/// Current layout version of the `capabilities` cookie.
pub const FORMAT_VERSION: u8 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty capability cookie")]
    Empty,

    #[error("unsupported capability format version {found} (expected {expected})")]
    VersionMismatch { found: u8, expected: u8 },

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("invalid gzip stream: {0}")]
    Compression(String),

    #[error("invalid capability json: {0}")]
    Json(String),
}

/// Encode capability records into the `capabilities` cookie value.
pub fn encode_capabilities(records: &[CapabilityRecord]) -> Result<String, CodecError> {
    let json = serde_json::to_vec(records).map_err(|e| CodecError::Json(e.to_string()))?;

    let mut encoder = GzEncoder::new(vec![FORMAT_VERSION], Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    let bytes = encoder
        .finish()
        .map_err(|e| CodecError::Compression(e.to_string()))?;

    Ok(BASE64_STANDARD.encode(bytes))
}

/// Strictly decode a `capabilities` cookie value.
pub fn decode_capabilities(value: &str) -> Result<Vec<CapabilityRecord>, CodecError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CodecError::Empty);
    }

    let bytes = BASE64_STANDARD
        .decode(value)
        .map_err(|e| CodecError::Base64(e.to_string()))?;

    let (&version, body) = bytes.split_first().ok_or(CodecError::Empty)?;
    if version != FORMAT_VERSION {
        return Err(CodecError::VersionMismatch {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let mut json = Vec::new();
    GzDecoder::new(body)
        .read_to_end(&mut json)
        .map_err(|e| CodecError::Compression(e.to_string()))?;

    serde_json::from_slice(&json).map_err(|e| CodecError::Json(e.to_string()))
}

/// Encode roles and features into the `access` cookie value.
pub fn encode_access<'a>(
    roles: impl IntoIterator<Item = &'a Role>,
    features: impl IntoIterator<Item = &'a Feature>,
) -> String {
    let roles: Vec<&str> = roles.into_iter().map(Role::as_str).collect();
    let features: Vec<&str> = features.into_iter().map(Feature::as_str).collect();
    format!("{}|{}", roles.join(","), features.join(","))
}

/// Decode the `access` cookie value. Unknown shapes yield empty sets.
pub fn decode_access(value: &str) -> (Vec<Role>, Vec<Feature>) {
    let (roles, features) = value.split_once('|').unwrap_or((value, ""));

    let split = |s: &str| -> Vec<String> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    };

    (
        split(roles).into_iter().map(Role::new).collect(),
        split(features).into_iter().map(Feature::new).collect(),
    )
}

/// Build a table from both cookie values, failing closed.
///
/// A missing or unreadable `capabilities` cookie produces the empty table:
/// roles and features are dropped as well so a half-decoded table can never
/// grant more than nothing.
pub fn decode_table(capabilities: Option<&str>, access: Option<&str>) -> CapabilityTable {
    let Some(capabilities) = capabilities else {
        return CapabilityTable::empty();
    };

    let records = match decode_capabilities(capabilities) {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = %err, "capability cookie rejected; denying all");
            return CapabilityTable::empty();
        }
    };

    let (roles, features) = access.map(decode_access).unwrap_or_default();

    CapabilityTable::from_records(records)
        .with_roles(roles)
        .with_features(features)
}

/// Encode a whole table into `(capabilities, access)` cookie values.
pub fn encode_table(table: &CapabilityTable) -> Result<(String, String), CodecError> {
    let mut roles: Vec<&Role> = table.roles().collect();
    roles.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    let mut features: Vec<&Feature> = table.features().collect();
    features.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    Ok((
        encode_capabilities(&table.records())?,
        encode_access(roles, features),
    ))
}
