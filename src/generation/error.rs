//! Operator-facing generation errors and the classifier that maps raw
//! service failures onto them.
//!
//! The raw error text is searched for an embedded JSON error body
//! (`{"error": {"code": 403, "message": "...", "status": "PERMISSION_DENIED"}}`).
//! When one is found its `message` replaces the generic text, and its
//! `code`/`status` feed the classification alongside the HTTP status.

use thiserror::Error;

use super::service::ServiceError;

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

/// Every way a generation attempt can end without a committed alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// No credential stored.  A precondition: the request is parked and the
    /// operator prompted, no failure banner.
    #[error("an API key is required")]
    MissingCredential,

    /// The operator typed an implausible credential.
    #[error("invalid API key: it must be at least {min} characters long")]
    InvalidCredential { min: usize },

    /// The payload exceeds the local size ceiling; nothing was sent.
    #[error("file too large ({size} bytes, limit is {max} bytes)")]
    PayloadTooLarge { size: u64, max: u64 },

    /// A style snapshot did not have the expected shape.
    #[error("invalid style file: {0}")]
    Format(String),

    /// Unauthenticated, forbidden or invalid key.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Rate limit or quota exhausted.
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Transient upstream outage.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The stream closed without any text.
    #[error("the model returned an empty result")]
    EmptyResult,

    /// Anything else, reported verbatim.
    #[error("AI error: {0}")]
    Unknown(String),

    /// The audio could not be read locally.
    #[error("error processing the file: {0}")]
    Io(String),
}

impl GenerationError {
    /// `true` for failures that re-arm the parked request and re-open the
    /// credential prompt.
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::Auth(_))
    }

    /// `true` for failures detected before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::InvalidCredential { .. }
                | Self::PayloadTooLarge { .. }
                | Self::Format(_)
                | Self::Io(_)
        )
    }
}

impl From<crate::audio::PayloadError> for GenerationError {
    fn from(e: crate::audio::PayloadError) -> Self {
        match e {
            crate::audio::PayloadError::TooLarge { size, max } => {
                Self::PayloadTooLarge { size, max }
            }
            other => Self::Io(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Structured error bodies
// ---------------------------------------------------------------------------

/// The `error` object of a structured service error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub code: Option<i64>,
    pub status: Option<String>,
}

/// Parse the JSON that starts at the first `{` of `raw`, if any.
///
/// Returns `None` when there is no brace, the tail is not JSON, or it has no
/// `error` object.
pub fn extract_error_body(raw: &str) -> Option<ErrorBody> {
    let parse_from = |open: char| {
        let start = raw.find(open)?;
        serde_json::from_str::<serde_json::Value>(raw[start..].trim_end()).ok()
    };
    let value = parse_from('{').or_else(|| parse_from('['))?;
    // Some transports wrap the error in a one-element array.
    let value = match value {
        serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    let error = value.get("error")?;

    Some(ErrorBody {
        message: error["message"].as_str().map(str::to_string),
        code: error["code"].as_i64(),
        status: error["status"].as_str().map(str::to_string),
    })
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Auth,
    Quota,
    Unavailable,
    Unknown,
}

const AUTH_STATUSES: &[&str] = &["UNAUTHENTICATED", "PERMISSION_DENIED", "API_KEY_INVALID"];
const QUOTA_STATUSES: &[&str] = &["RESOURCE_EXHAUSTED"];
const UNAVAILABLE_STATUSES: &[&str] = &["UNAVAILABLE", "DEADLINE_EXCEEDED"];

const AUTH_PHRASES: &[&str] = &["api key", "api_key", "unauthorized", "forbidden"];
const QUOTA_PHRASES: &[&str] = &["quota", "rate limit", "too many requests"];
const UNAVAILABLE_PHRASES: &[&str] = &["overloaded", "service unavailable", "try again later"];

fn class_of_code(code: i64) -> Class {
    match code {
        401 | 403 => Class::Auth,
        429 => Class::Quota,
        502..=504 => Class::Unavailable,
        _ => Class::Unknown,
    }
}

fn class_of_text(text: &str) -> Class {
    let upper = text.to_ascii_uppercase();
    let lower = text.to_lowercase();
    let has_status = |set: &[&str]| set.iter().any(|s| upper.contains(s));
    let has_phrase = |set: &[&str]| set.iter().any(|p| lower.contains(p));

    if has_status(AUTH_STATUSES) || has_phrase(AUTH_PHRASES) {
        Class::Auth
    } else if has_status(QUOTA_STATUSES) || has_phrase(QUOTA_PHRASES) {
        Class::Quota
    } else if has_status(UNAVAILABLE_STATUSES) || has_phrase(UNAVAILABLE_PHRASES) {
        Class::Unavailable
    } else {
        Class::Unknown
    }
}

/// Map a raw service failure onto the operator-facing taxonomy.
///
/// Signals are checked from most to least specific: HTTP status, the
/// structured body's `code`, its `status` and message text, then the raw
/// text.  The reported message is the structured `message` when present,
/// otherwise the raw error text.
pub fn classify(err: &ServiceError) -> GenerationError {
    let raw = match err {
        ServiceError::Api { body, .. } if !body.trim().is_empty() => body.clone(),
        other => other.to_string(),
    };
    let body = extract_error_body(&raw);

    let message = body
        .as_ref()
        .and_then(|b| b.message.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| raw.clone());

    let http_status = match err {
        ServiceError::Api { status, .. } => Some(i64::from(*status)),
        _ => None,
    };

    let mut class = http_status.map_or(Class::Unknown, class_of_code);
    if class == Class::Unknown {
        if let Some(code) = body.as_ref().and_then(|b| b.code) {
            class = class_of_code(code);
        }
    }
    if class == Class::Unknown {
        let status = body.as_ref().and_then(|b| b.status.clone()).unwrap_or_default();
        class = class_of_text(&format!("{status} {message}"));
    }
    if class == Class::Unknown {
        class = class_of_text(&raw);
    }
    if class == Class::Unknown && matches!(err, ServiceError::Timeout) {
        class = Class::Unavailable;
    }

    match class {
        Class::Auth => GenerationError::Auth(message),
        Class::Quota => GenerationError::Quota(message),
        Class::Unavailable => GenerationError::ServiceUnavailable(message),
        Class::Unknown => GenerationError::Unknown(message),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, body: &str) -> ServiceError {
        ServiceError::Api {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn extracts_message_after_prefix() {
        let raw = r#"got status 400: {"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let body = extract_error_body(raw).unwrap();
        assert_eq!(
            body.message.as_deref(),
            Some("API key not valid. Please pass a valid API key.")
        );
        assert_eq!(body.code, Some(400));
        assert_eq!(body.status.as_deref(), Some("INVALID_ARGUMENT"));
    }

    #[test]
    fn extraction_tolerates_garbage() {
        assert!(extract_error_body("plain failure").is_none());
        assert!(extract_error_body("broken {json").is_none());
        assert!(extract_error_body(r#"{"candidates":[]}"#).is_none());
    }

    #[test]
    fn extraction_unwraps_single_element_array() {
        let body = extract_error_body(r#"[{"error":{"code":503,"message":"overloaded"}}]"#).unwrap();
        assert_eq!(body.code, Some(503));
    }

    #[test]
    fn forbidden_is_auth_with_structured_message() {
        let err = classify(&api(
            403,
            r#"{"error":{"code":403,"message":"Method doesn't allow unregistered callers.","status":"PERMISSION_DENIED"}}"#,
        ));
        assert_eq!(
            err,
            GenerationError::Auth("Method doesn't allow unregistered callers.".into())
        );
        assert!(err.requires_credential());
    }

    #[test]
    fn invalid_key_reported_as_400_is_auth() {
        let err = classify(&api(
            400,
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#,
        ));
        assert!(matches!(err, GenerationError::Auth(_)));
    }

    #[test]
    fn quota_signals() {
        assert!(matches!(
            classify(&api(429, r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#)),
            GenerationError::Quota(_)
        ));
        assert!(matches!(
            classify(&ServiceError::Stream(r#"{"error":{"code":429,"message":"slow down"}}"#.into())),
            GenerationError::Quota(_)
        ));
    }

    #[test]
    fn unavailable_signals() {
        let err = classify(&api(
            503,
            r#"{"error":{"code":503,"message":"The model is overloaded. Please try again later.","status":"UNAVAILABLE"}}"#,
        ));
        assert_eq!(
            err,
            GenerationError::ServiceUnavailable(
                "The model is overloaded. Please try again later.".into()
            )
        );
        assert!(matches!(classify(&ServiceError::Timeout), GenerationError::ServiceUnavailable(_)));
    }

    #[test]
    fn unknown_is_reported_verbatim() {
        let err = classify(&ServiceError::Request("connection reset by peer".into()));
        assert_eq!(
            err,
            GenerationError::Unknown("HTTP request failed: connection reset by peer".into())
        );

        let err = classify(&api(400, r#"{"error":{"code":400,"message":"Unsupported MIME type: audio/xyz","status":"INVALID_ARGUMENT"}}"#));
        assert_eq!(err, GenerationError::Unknown("Unsupported MIME type: audio/xyz".into()));
    }

    #[test]
    fn empty_api_body_uses_status_line() {
        let err = classify(&api(500, ""));
        assert_eq!(err, GenerationError::Unknown("[500] ".into()));
    }

    #[test]
    fn only_auth_requires_credential() {
        assert!(GenerationError::MissingCredential.requires_credential());
        assert!(!GenerationError::Quota("x".into()).requires_credential());
        assert!(!GenerationError::EmptyResult.requires_credential());
        assert!(GenerationError::PayloadTooLarge { size: 2, max: 1 }.is_local());
        assert!(!GenerationError::Auth("x".into()).is_local());
    }
}
