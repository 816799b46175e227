use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use tenantkit_auth::AuthzError;
use tenantkit_core::DataError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn authz_error_to_response(err: AuthzError) -> Response {
    let message = err.to_string();
    match err {
        AuthzError::PermissionDenied { module, action, reason } => (
            StatusCode::FORBIDDEN,
            axum::Json(json!({
                "error": "permission_denied",
                "message": message,
                "module": module,
                "action": action,
                "reason": reason,
            })),
        )
            .into_response(),
    }
}

pub fn data_error_to_response(err: DataError) -> Response {
    match err {
        DataError::UnknownType(name) => {
            json_error(StatusCode::NOT_FOUND, "unknown_type", format!("unknown entity type '{name}'"))
        }
        DataError::PermissionDenied(msg) => json_error(StatusCode::FORBIDDEN, "permission_denied", msg),
        DataError::UnsupportedOperation { .. } => {
            json_error(StatusCode::METHOD_NOT_ALLOWED, "unsupported_operation", err.to_string())
        }
        DataError::Api { status, message } => json_error(
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            "upstream_error",
            message,
        ),
        DataError::Transport(msg) => json_error(StatusCode::BAD_GATEWAY, "transport_error", msg),
        DataError::Decode(msg) => json_error(StatusCode::BAD_GATEWAY, "decode_error", msg),
        DataError::MissingField { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "missing_field", err.to_string())
        }
    }
}
