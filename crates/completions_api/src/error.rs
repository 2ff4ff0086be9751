use std::fmt;

use chat_transport::TransportError;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::extract::ExtractError;

#[derive(Debug)]
pub enum CompletionsApiError {
    InvalidHeader(String),
    Request(reqwest::Error),
    AuthenticationFailed { body: String },
    EndpointNotFound { body: String },
    Status { status: StatusCode, body: String },
    Serde(JsonError),
    EmptyCompletion,
    Cancelled,
}

impl CompletionsApiError {
    /// Classifies a non-2xx response, keeping the raw body text.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::AuthenticationFailed { body },
            StatusCode::NOT_FOUND => Self::EndpointNotFound { body },
            _ => Self::Status { status, body },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
}

impl fmt::Display for CompletionsApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => {
                if error.is_timeout() {
                    write!(f, "request timed out")
                } else if error.is_connect() {
                    write!(f, "unable to connect to the API: {error}")
                } else {
                    write!(f, "request error: {error}")
                }
            }
            Self::AuthenticationFailed { .. } => {
                write!(f, "authentication failed - check your API key")
            }
            Self::EndpointNotFound { .. } => {
                write!(f, "endpoint not found - check the base URL and model name")
            }
            Self::Status { status, body } => {
                write!(f, "HTTP {status}: {}", parse_error_message(*status, body))
            }
            Self::Serde(error) => write!(f, "invalid response body: {error}"),
            Self::EmptyCompletion => write!(f, "API returned an empty completion"),
            Self::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

impl std::error::Error for CompletionsApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            Self::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CompletionsApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

impl From<JsonError> for CompletionsApiError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

impl From<CompletionsApiError> for TransportError {
    fn from(error: CompletionsApiError) -> Self {
        match error {
            CompletionsApiError::Cancelled => Self::Aborted,
            CompletionsApiError::AuthenticationFailed { body } => {
                Self::AuthenticationFailed { body }
            }
            CompletionsApiError::EndpointNotFound { body } => Self::EndpointNotFound { body },
            CompletionsApiError::Status { status, body } => Self::Api {
                status: status.as_u16(),
                body,
            },
            CompletionsApiError::Serde(error) => Self::MalformedStream(error.to_string()),
            other => Self::Network(other.to_string()),
        }
    }
}

/// Extracts `error.message` from an API error body, falling back to the raw
/// text or the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let explicit = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|fields| fields.message)
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = explicit {
        return message;
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

/// Failure of a one-shot call whose reply must be a JSON object.
#[derive(Debug, Error)]
pub enum StructuredCallError {
    #[error("could not reach the AI service: {0}")]
    Unreachable(#[source] CompletionsApiError),

    #[error("the AI service replied, but not with valid JSON: {0}")]
    InvalidPayload(#[source] ExtractError),
}

impl StructuredCallError {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unreachable(CompletionsApiError::Cancelled) => {
                "The request was cancelled.".to_string()
            }
            Self::Unreachable(error) => {
                format!("Could not reach the AI service ({error}). Check your connection and settings.")
            }
            Self::InvalidPayload(_) => {
                "The AI service responded, but its reply was not valid JSON. Please try again."
                    .to_string()
            }
        }
    }
}
