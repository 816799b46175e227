//! Data-layer error model.

use thiserror::Error;

/// Result type used across the data-access layer.
pub type DataResult<T> = Result<T, DataError>;

/// Data-access error.
///
/// Variants map one-to-one onto the failure classes callers have to tell
/// apart: programmer/bootstrap mistakes (`UnknownType`, `MissingField`,
/// `UnsupportedOperation`) versus remote failures (`Api`, `Transport`,
/// `Decode`) versus authorization (`PermissionDenied`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// No descriptor is registered for the requested entity type.
    ///
    /// Fatal: a feature module forgot to register its kinds at bootstrap.
    #[error("unknown entity type '{0}'")]
    UnknownType(String),

    /// A required accessor was read on an entity that was never populated.
    #[error("missing required field '{field}' on '{entity}'")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// The entity kind has no write path (read-only projection).
    #[error("operation '{operation}' is not supported for '{entity_type}'")]
    UnsupportedOperation {
        entity_type: String,
        operation: &'static str,
    },

    /// The server answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The acting principal may not perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl DataError {
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType(name.into())
    }

    pub fn missing_field(entity: &'static str, field: &'static str) -> Self {
        Self::MissingField { entity, field }
    }

    pub fn unsupported(entity_type: impl Into<String>, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            entity_type: entity_type.into(),
            operation,
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// True for errors raised by the remote side or the network.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Transport(_) | Self::Decode(_))
    }
}

impl From<serde_json::Error> for DataError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
