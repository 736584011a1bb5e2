//! Uniform tool results.
//!
//! Every outcome of a tool call, local or remote, ends up as a
//! [`ToolResult`]: either a success payload or a short error sentence an
//! agent can relay as-is.

use serde::Serialize;
use serde_json::Value;

use crate::transport::{RawResponse, TransportError};
use crate::validate::ValidationError;

/// Error taxonomy visible to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Transport,
    ClientError,
    ServerError,
    Protocol,
    UnexpectedStatus,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::ClientError => "client_error",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Protocol => "protocol",
            ErrorKind::UnexpectedStatus => "unexpected_status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
}

/// The only output of a tool call. `payload` is set iff `ok`, `error` iff not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        Self {
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: None,
            error: Some(ToolError {
                kind,
                message: message.into(),
            }),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

impl From<ValidationError> for ToolResult {
    fn from(err: ValidationError) -> Self {
        ToolResult::failure(ErrorKind::Validation, err.to_string())
    }
}

impl From<TransportError> for ToolResult {
    fn from(err: TransportError) -> Self {
        ToolResult::failure(ErrorKind::Transport, err.to_string())
    }
}

/// Normalize the outcome of one broker call.
pub fn normalize(outcome: Result<RawResponse, TransportError>) -> ToolResult {
    match outcome {
        Ok(response) => normalize_response(&response),
        Err(err) => err.into(),
    }
}

pub fn normalize_response(response: &RawResponse) -> ToolResult {
    let status = response.status;
    match status {
        200..=299 => parse_success(response),
        // Rate limiting has no agreed handling yet; surface it without retrying.
        429 => ToolResult::failure(
            ErrorKind::UnexpectedStatus,
            format!(
                "Broker answered with unexpected status {} (rate limited)",
                status_text(status)
            ),
        ),
        400..=499 => {
            let message = match broker_message(&response.body) {
                Some(detail) => format!(
                    "Broker rejected the request ({}): {}",
                    status_text(status),
                    detail
                ),
                None => format!("Broker rejected the request: {}", status_text(status)),
            };
            ToolResult::failure(ErrorKind::ClientError, message)
        }
        500..=u16::MAX => ToolResult::failure(
            ErrorKind::ServerError,
            format!("Broker failed to handle the request: {}", status_text(status)),
        ),
        _ => ToolResult::failure(
            ErrorKind::UnexpectedStatus,
            format!("Broker answered with unexpected status {}", status_text(status)),
        ),
    }
}

fn parse_success(response: &RawResponse) -> ToolResult {
    // 204 and friends carry no body; the status alone is the acknowledgement.
    if response.body.trim().is_empty() {
        return ToolResult::success(Value::Null);
    }
    match serde_json::from_str::<Value>(&response.body) {
        Ok(payload) => ToolResult::success(payload),
        Err(e) => ToolResult::failure(
            ErrorKind::Protocol,
            format!(
                "Broker returned a malformed response ({}): {}",
                status_text(response.status),
                e
            ),
        ),
    }
}

/// Extract `message` (and `code`) from a broker error body.
fn broker_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let field = |name: &str| match value.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    };

    match (field("message"), field("code")) {
        (Some(message), Some(code)) => Some(format!("{} [{}]", message, code)),
        (Some(message), None) => Some(message),
        (None, Some(code)) => Some(code),
        (None, None) => None,
    }
}

/// `404 Not Found`, or just the number for unregistered codes.
pub fn status_text(status: u16) -> String {
    match reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("{} {}", status, reason),
        None => status.to_string(),
    }
}
