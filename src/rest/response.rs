//! Response envelope parsing and error classification.
//!
//! Every AppNexus response body has the shape `{"response": {...}}`. Errors
//! are reported inside the envelope:
//!
//! ```json
//! {"response": {"error_id": "NOAUTH", "error": "Authentication failed", "error_code": null}}
//! ```
//!
//! Parsing is lenient: a body that is not a valid envelope yields no values
//! instead of an error, so existence checks can treat it as "not found".

use serde_json::Value;

use crate::error::{ApiError, ErrorKind};
use crate::types::Values;

/// Some endpoints prepend a literal `{}` to the real body.
const BODY_QUIRK_PREFIX: &str = "{}";

/// Which classified errors abort a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalityPolicy {
    /// Only NoAuth, UnAuth and System errors are fatal. Other errors are
    /// handed back to the operation, which usually treats them as "absent".
    Transport,
    /// Every error is fatal. Used by create and update.
    Strict,
}

impl FatalityPolicy {
    /// Whether an error of `kind` aborts the call under this policy.
    pub fn is_fatal(&self, kind: ErrorKind) -> bool {
        match self {
            Self::Transport => matches!(
                kind,
                ErrorKind::NoAuth | ErrorKind::UnAuth | ErrorKind::System
            ),
            Self::Strict => true,
        }
    }
}

/// Strip the `{}` prefix quirk, if present.
pub fn strip_body_quirk(body: &str) -> &str {
    let trimmed = body.trim_start();
    match trimmed.strip_prefix(BODY_QUIRK_PREFIX) {
        Some(rest) if !rest.trim().is_empty() => rest,
        _ => trimmed,
    }
}

/// Parse a body and return the object inside the `response` key.
///
/// Returns `None` for malformed JSON or a missing envelope.
pub fn parse_envelope(body: &str) -> Option<Values> {
    let parsed: Value = serde_json::from_str(strip_body_quirk(body)).ok()?;
    match parsed {
        Value::Object(mut root) => match root.remove("response")? {
            Value::Object(envelope) => Some(envelope),
            _ => None,
        },
        _ => None,
    }
}

/// Classify the error carried by an envelope, if any.
///
/// An envelope is an error when it has an `error` key. This is a pure
/// function of its inputs.
pub fn classify(envelope: &Values, raw_response: &str) -> Option<ApiError> {
    let error = envelope.get("error")?;

    let kind = envelope
        .get("error_id")
        .and_then(Value::as_str)
        .map(ErrorKind::from_error_id)
        .unwrap_or(ErrorKind::Unknown);

    let code = envelope.get("error_code").and_then(|code| match code {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    let message = match error {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };

    Some(ApiError::new(kind, code, message, raw_response))
}

/// Read an unsigned integer field that may be encoded as a number or string.
pub(crate) fn u64_field(values: &Values, field: &str) -> Option<u64> {
    match values.get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
