//! Minimal provider-neutral contract for streaming one chat turn.
//!
//! This crate defines the message model, the incremental delta stream and the
//! error taxonomy shared by every transport. It excludes provider payloads and
//! session bookkeeping, which live in the transport and session crates.

use std::fmt;
use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

pub mod cancel;
pub mod error;
pub mod sse;

pub use cancel::{await_or_cancel, cancel_signal, is_cancelled, CancelSignal};
pub use error::TransportError;
pub use sse::{SseLine, SseLineBuffer};

/// Author of one chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One entry of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// Opaque text fragment emitted by a transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta(String);

impl TextDelta {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for TextDelta {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for TextDelta {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl fmt::Display for TextDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input for one streamed turn.
///
/// `history` holds the messages that precede `message`; it never contains the
/// new user message itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub message: String,
    pub history: Vec<ChatMessage>,
    pub system_prompt: String,
}

impl SendRequest {
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        history: Vec<ChatMessage>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            history,
            system_prompt: system_prompt.into(),
        }
    }
}

/// Ordered delta sequence produced by one `send`.
///
/// A stream yields `Err` at most once and ends right after it.
pub type DeltaStream<'a> =
    Pin<Box<dyn Stream<Item = Result<TextDelta, TransportError>> + Send + 'a>>;

/// Immutable metadata describing a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProfile {
    pub transport_id: String,
    pub model_id: String,
}

/// Capability interface implemented once per streaming protocol.
///
/// Implementations are picked when a chat session is constructed and are not
/// re-selected per call.
pub trait ChatTransport: Send {
    /// Returns transport/model identity metadata.
    fn profile(&self) -> TransportProfile;

    /// Streams the model reply to `request`.
    ///
    /// `cancel` is checked before the request is issued and after every chunk,
    /// and is threaded into the network call so a pending read is abandoned.
    fn send(&mut self, request: SendRequest, cancel: CancelSignal) -> DeltaStream<'_>;

    /// Discards conversation state held by the transport itself.
    fn reset(&mut self) {}
}
