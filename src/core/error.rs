//! Error types shared by every Watson service client.
//!
//! Validation failures are raised before any network I/O and are kept
//! distinct from remote failures, which carry the decoded error payload of
//! the non-2xx response.

use http::HeaderMap;
use serde_json::Value;
use thiserror::Error;

/// Result type for Watson operations
pub type WatsonResult<T> = Result<T, WatsonError>;

/// Header carrying the IBM Cloud transaction id of a request.
pub const TRANSACTION_ID_HEADER: &str = "X-Global-Transaction-Id";

/// Error type for all service clients
#[derive(Error, Debug)]
pub enum WatsonError {
    // ─────────────────────────────────────────────────────────────────────────────
    // Raised before the request leaves the process
    // ─────────────────────────────────────────────────────────────────────────────
    /// A required parameter was absent or empty
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// A parameter was present but unusable
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The service client itself is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ─────────────────────────────────────────────────────────────────────────────
    // Raised while talking to the service
    // ─────────────────────────────────────────────────────────────────────────────
    /// Credentials could not be turned into an Authorization header
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Transport level failure (DNS, TLS, connection reset)
    #[error("Network error: {0}")]
    Network(String),

    /// A request timeout or the job polling deadline expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The service answered with a non-2xx status
    #[error("{0}")]
    Service(Box<ServiceError>),

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Streaming recognition failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Callback payload signature did not match the shared secret
    #[error("Callback signature verification failed")]
    InvalidSignature,
}

impl WatsonError {
    /// Shorthand for [`WatsonError::MissingParameter`].
    pub fn missing(name: &str) -> Self {
        Self::MissingParameter(name.to_string())
    }

    /// Shorthand for [`WatsonError::InvalidParameter`].
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Fail with [`WatsonError::MissingParameter`] when `value` is empty.
    pub fn require(name: &str, value: &str) -> WatsonResult<()> {
        if value.trim().is_empty() {
            return Err(Self::missing(name));
        }
        Ok(())
    }

    /// True for errors raised before any network I/O took place.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_) | Self::InvalidParameter { .. } | Self::Configuration(_)
        )
    }

    /// HTTP status code of a service error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Service(err) => Some(err.status_code),
            _ => None,
        }
    }

    /// The decoded service error, if this is one.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WatsonError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WatsonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Service errors
// =============================================================================

/// Decoded non-2xx response.
#[derive(Debug, Clone)]
pub struct ServiceError {
    /// HTTP status code
    pub status_code: u16,
    /// Human readable message extracted from the body
    pub message: String,
    /// Raw response body, parsed as JSON when possible
    pub body: Option<Value>,
    /// Transaction id reported by the service
    pub transaction_id: Option<String>,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Service error ({}): {}", self.status_code, self.message)?;
        if let Some(id) = &self.transaction_id {
            write!(f, " [transaction id: {id}]")?;
        }
        Ok(())
    }
}

impl ServiceError {
    /// Build a service error from a status code, headers and raw body.
    pub fn from_response(status_code: u16, headers: &HeaderMap, raw_body: &str) -> Self {
        let body = serde_json::from_str::<Value>(raw_body).ok();
        let message = body
            .as_ref()
            .and_then(extract_error_message)
            .or_else(|| {
                let trimmed = raw_body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                http::StatusCode::from_u16(status_code)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        let transaction_id = headers
            .get(TRANSACTION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            status_code,
            message,
            body,
            transaction_id,
        }
    }
}

/// Pull the message out of the error shapes Watson services return.
///
/// Checked in order: `errors[0].message`, `error` (string or object with
/// `message`), `message`, `errorMessage`.
fn extract_error_message(body: &Value) -> Option<String> {
    if let Some(msg) = body
        .get("errors")
        .and_then(|e| e.get(0))
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(msg.to_string());
    }

    match body.get("error") {
        Some(Value::String(msg)) => return Some(msg.clone()),
        Some(obj @ Value::Object(_)) => {
            if let Some(msg) = obj.get("message").and_then(Value::as_str) {
                return Some(msg.to_string());
            }
        }
        _ => {}
    }

    ["message", "errorMessage"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_message_from_errors_array() {
        let err = ServiceError::from_response(
            400,
            &HeaderMap::new(),
            r#"{"errors":[{"code":"bad","message":"first problem"},{"message":"second"}]}"#,
        );
        assert_eq!(err.status_code, 400);
        assert_eq!(err.message, "first problem");
    }

    #[test]
    fn test_message_from_error_string() {
        let err = ServiceError::from_response(
            404,
            &HeaderMap::new(),
            r#"{"error":"Malformed GUID: 'abc'","code":404,"code_description":"Not Found"}"#,
        );
        assert_eq!(err.message, "Malformed GUID: 'abc'");
    }

    #[test]
    fn test_message_from_nested_error_object() {
        let err = ServiceError::from_response(
            400,
            &HeaderMap::new(),
            r#"{"error":{"code":"400","message":"Invalid image"}}"#,
        );
        assert_eq!(err.message, "Invalid image");
    }

    #[test]
    fn test_message_from_error_message_key() {
        let err =
            ServiceError::from_response(500, &HeaderMap::new(), r#"{"errorMessage":"boom"}"#);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_plain_text_and_empty_bodies() {
        let err = ServiceError::from_response(502, &HeaderMap::new(), "upstream down");
        assert_eq!(err.message, "upstream down");
        assert!(err.body.is_none());

        let err = ServiceError::from_response(503, &HeaderMap::new(), "");
        assert_eq!(err.message, "Service Unavailable");
    }

    #[test]
    fn test_transaction_id_is_captured() {
        let mut headers = HeaderMap::new();
        headers.insert(TRANSACTION_ID_HEADER, HeaderValue::from_static("txn-123"));
        let err = ServiceError::from_response(409, &headers, r#"{"error":"conflict"}"#);
        assert_eq!(err.transaction_id.as_deref(), Some("txn-123"));
        assert!(err.to_string().contains("txn-123"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(WatsonError::missing("audio").is_validation());
        assert!(WatsonError::invalid("audio", "too small").is_validation());
        assert!(!WatsonError::Network("reset".into()).is_validation());

        let service = WatsonError::Service(Box::new(ServiceError::from_response(
            400,
            &HeaderMap::new(),
            "",
        )));
        assert_eq!(service.status_code(), Some(400));
        assert!(!service.is_validation());
    }
}
