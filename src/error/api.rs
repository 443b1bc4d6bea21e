use desidia_schema::ApiErrorBody;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error as ThisError;

const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Coarse classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was received (connect failure, timeout, broken body).
    Network,
    /// The server answered with a failure not covered by a narrower kind.
    Http,
    /// A 401 that survived a failed token refresh; the session is gone.
    AuthExpired,
    /// A 4xx carrying field-level `errors`.
    Validation,
    NotFound,
    Server,
}

/// The single error shape every transport call resolves to.
///
/// Built from whatever went wrong (socket error, HTTP status, undecodable
/// body) so stores and callers only ever match on one type.
#[derive(Debug, Clone, ThisError)]
#[error("{message} (code: {code})")]
pub struct ApiError {
    pub kind: ErrorKind,
    /// `None` when no response was received.
    pub status: Option<StatusCode>,
    pub message: String,
    pub errors: Vec<Value>,
    pub code: String,
}

impl ApiError {
    /// Normalize a non-2xx response from its status and raw body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<ApiErrorBody>(body).unwrap_or_default();

        let message = parsed
            .message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

        Self {
            kind: classify(status, &parsed.errors),
            status: Some(status),
            message,
            errors: parsed.errors,
            code: parsed.code.unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let message = err.to_string();
        Self {
            kind: ErrorKind::Network,
            status: None,
            message: if message.is_empty() {
                FALLBACK_MESSAGE.to_string()
            } else {
                message
            },
            errors: Vec::new(),
            code: "NETWORK_ERROR".to_string(),
        }
    }

    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::AuthExpired,
            status: Some(StatusCode::UNAUTHORIZED),
            message: message.into(),
            errors: Vec::new(),
            code: "AUTH_EXPIRED".to_string(),
        }
    }

    /// A 2xx body that did not match the expected shape.
    pub fn decode(err: &serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Http,
            status: None,
            message: format!("Failed to decode response: {err}"),
            errors: Vec::new(),
            code: "DECODE_ERROR".to_string(),
        }
    }

    /// A request body that could not be turned into JSON.
    pub fn encode(err: &serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Http,
            status: None,
            message: format!("Failed to encode request body: {err}"),
            errors: Vec::new(),
            code: "ENCODE_ERROR".to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED)
    }
}

fn classify(status: StatusCode, errors: &[Value]) -> ErrorKind {
    if status == StatusCode::NOT_FOUND {
        ErrorKind::NotFound
    } else if status.is_server_error() {
        ErrorKind::Server
    } else if status.is_client_error() && !errors.is_empty() {
        ErrorKind::Validation
    } else {
        ErrorKind::Http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).expect("encode body")
    }

    #[test]
    fn validation_errors_are_kept() {
        let err = ApiError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &body(json!({
                "message": "Validation failed",
                "code": "VALIDATION_ERROR",
                "errors": [{ "field": "title", "message": "required" }],
            })),
        );

        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.status, Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert_eq!(err.message, "Validation failed");
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert_eq!(err.errors.len(), 1);
    }

    #[test]
    fn client_error_without_field_errors_is_plain_http() {
        let err = ApiError::from_response(
            StatusCode::FORBIDDEN,
            &body(json!({ "message": "Nope" })),
        );

        assert_eq!(err.kind, ErrorKind::Http);
        assert_eq!(err.code, "UNKNOWN_ERROR");
    }

    #[test]
    fn not_found_and_server_errors_are_classified() {
        let not_found = ApiError::from_response(StatusCode::NOT_FOUND, b"");
        assert_eq!(not_found.kind, ErrorKind::NotFound);
        assert_eq!(not_found.message, "Not Found");

        let server = ApiError::from_response(StatusCode::BAD_GATEWAY, b"<html>upstream</html>");
        assert_eq!(server.kind, ErrorKind::Server);
        assert!(server.errors.is_empty());
    }

    #[test]
    fn auth_expired_reports_unauthorized() {
        let err = ApiError::auth_expired("Session expired");
        assert_eq!(err.kind, ErrorKind::AuthExpired);
        assert!(err.is_unauthorized());
        assert_eq!(err.code, "AUTH_EXPIRED");
    }
}
