//! Strongly-typed identifiers used across the data layer.
//!
//! Server-issued identifiers are opaque strings; the newtypes only keep them
//! from being mixed up at call sites.

use core::str::FromStr;
use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Identifier of a tenant company (multi-tenant boundary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(String);

/// Identifier of a user (actor identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $t {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $t {
            type Err = DataError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DataError::decode(format!("{}: empty identifier", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_newtype!(CompanyId, "CompanyId");
impl_string_newtype!(UserId, "UserId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_empty() {
        let id: UserId = " u1 ".parse().unwrap();
        assert_eq!(id.as_str(), "u1");
        assert!("   ".parse::<CompanyId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let id = CompanyId::new("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");
    }
}
