use thiserror::Error;

/// Failure of one streamed turn.
///
/// Transports surface failures through this type instead of ending the delta
/// stream silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request was cancelled")]
    Aborted,

    #[error("authentication failed - check your API key")]
    AuthenticationFailed { body: String },

    #[error("endpoint not found - check the base URL and model name")]
    EndpointNotFound { body: String },

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed stream: {0}")]
    MalformedStream(String),

    #[error("chat session error: {0}")]
    Session(String),
}

impl TransportError {
    /// Classifies a non-2xx HTTP response.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 => Self::AuthenticationFailed { body },
            404 => Self::EndpointNotFound { body },
            _ => Self::Api { status, body },
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { .. } => Some(401),
            Self::EndpointNotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::AuthenticationFailed { body }
            | Self::EndpointNotFound { body }
            | Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}
