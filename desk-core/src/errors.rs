//! # Errors
//!
//! Desk uses one structured error type across crates.
//! Core goals:
//! - consistent kinds mapped from HTTP status codes
//! - can be carried through `anyhow::Error`
//! - one human-readable message for the UI layer, never a raw payload
//!
//! Callers receive failures in the backend's normalized shape through
//! [`DeskError::to_envelope`]: `{ "success": false, "message": ... }`.

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::{json, Value};

/// A convenience result type for Desk APIs.
pub type DeskResult<T> = std::result::Result<T, AnyError>;

/// Message used when a payload carries nothing readable.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Error kinds with their HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    Timeout,          // 408
    Conflict,         // 409
    Unprocessable,    // 422
    TooManyRequests,  // 429
    GeneralError,     // 500
    BadGateway,       // 502
    Unavailable,      // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Timeout => 408,
            ErrorKind::Conflict => 409,
            ErrorKind::Unprocessable => 422,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::GeneralError => 500,
            ErrorKind::BadGateway => 502,
            ErrorKind::Unavailable => 503,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Unprocessable => "Unprocessable",
            ErrorKind::TooManyRequests => "TooManyRequests",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::BadGateway => "BadGateway",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// Map a response status onto a kind.
    ///
    /// Unlisted 4xx statuses collapse to `BadRequest`, everything else to
    /// `GeneralError`.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorKind::NotAuthenticated,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            422 => ErrorKind::Unprocessable,
            429 => ErrorKind::TooManyRequests,
            502 => ErrorKind::BadGateway,
            503 => ErrorKind::Unavailable,
            400..=499 => ErrorKind::BadRequest,
            _ => ErrorKind::GeneralError,
        }
    }
}

/// A structured Desk error that can live inside `anyhow::Error`.
///
/// `data` holds the raw response payload when the error came from the
/// backend, so later stages can re-derive a message from it.
#[derive(Debug)]
pub struct DeskError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub source: Option<AnyError>,
}

impl DeskError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    /// Build an error from a failed response: status picks the kind, the
    /// payload supplies the message.
    pub fn from_response(status: u16, payload: Value) -> Self {
        let message = error_message(&payload);
        Self::new(ErrorKind::from_status(status), message).with_data(payload)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.kind == ErrorKind::NotAuthenticated
    }

    /// Convert into `anyhow::Error`.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `DeskError` if possible.
    pub fn from_anyhow(err: &AnyError) -> Option<&DeskError> {
        err.chain().find_map(|e| e.downcast_ref::<DeskError>())
    }

    /// Turn any error into a DeskError:
    /// - if it is already a DeskError, keep it
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> DeskError {
        match err.downcast::<DeskError>() {
            Ok(desk) => desk,
            Err(other) => DeskError::new(ErrorKind::GeneralError, other.to_string()).with_source(other),
        }
    }

    /// The message to show a user. Prefers whatever the backend payload says.
    pub fn user_message(&self) -> String {
        match &self.data {
            Some(data) => {
                let derived = error_message(data);
                if derived == FALLBACK_MESSAGE && !self.message.trim().is_empty() {
                    self.message.clone()
                } else {
                    derived
                }
            }
            None if self.message.trim().is_empty() => FALLBACK_MESSAGE.to_string(),
            None => self.message.clone(),
        }
    }

    /// Normalized failure shape handed to callers.
    pub fn to_envelope(&self) -> Value {
        json!({
            "success": false,
            "message": self.user_message(),
        })
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for DeskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for DeskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Collapse an error payload into one readable string.
///
/// Accepted shapes:
/// - `"plain text"`
/// - `{ "message": "..." }`
/// - `{ "errors": [ "...", { "message": "..." }, { "msg": "..." } ] }`
/// - `{ "errors": { "field": ["..."] } }`
/// - `{ "error": <any of the above> }`
///
/// A validation list wins over a generic `message` sitting next to it.
pub fn error_message(raw: &Value) -> String {
    let found = match raw {
        Value::String(s) => non_empty(s),
        Value::Array(items) => join_messages(items.iter().filter_map(item_message).collect()),
        Value::Object(map) => map
            .get("errors")
            .and_then(errors_message)
            .or_else(|| map.get("message").and_then(Value::as_str).and_then(non_empty))
            .or_else(|| map.get("error").map(error_message).filter(|m| m != FALLBACK_MESSAGE)),
        _ => None,
    };
    found.unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

fn errors_message(errors: &Value) -> Option<String> {
    match errors {
        Value::Array(items) => join_messages(items.iter().filter_map(item_message).collect()),
        Value::Object(fields) => {
            let parts = fields
                .iter()
                .flat_map(|(field, msgs)| {
                    let msgs = match msgs {
                        Value::Array(items) => items.iter().filter_map(item_message).collect(),
                        other => item_message(other).into_iter().collect::<Vec<_>>(),
                    };
                    msgs.into_iter().map(move |m| format!("{field}: {m}"))
                })
                .collect();
            join_messages(parts)
        }
        Value::String(s) => non_empty(s),
        _ => None,
    }
}

fn item_message(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => non_empty(s),
        Value::Object(map) => ["message", "msg"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str).and_then(non_empty)),
        _ => None,
    }
}

fn join_messages(parts: Vec<String>) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
