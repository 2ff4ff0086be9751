//! `ChatTransport` over a managed, stateful chat session.
//!
//! The session object is created lazily on the first send, so the system
//! prompt and prior history are handed over exactly once; later sends only
//! carry the new user message. [`ChatTransport::reset`] drops the session and
//! the next send creates a fresh one.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use chat_transport::{
    await_or_cancel, is_cancelled, CancelSignal, ChatMessage, ChatTransport, DeltaStream,
    SendRequest, TextDelta, TransportError, TransportProfile,
};
use futures_util::{stream, Stream, StreamExt};

pub mod gemini;
pub mod scripted;

pub use gemini::{GeminiBackend, GeminiConfig, GEMINI_TRANSPORT_ID};
pub use scripted::{ScriptedBackend, ScriptedReply, SCRIPTED_TRANSPORT_ID};

/// Text chunks produced by one managed send.
pub type ChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send + 'a>>;

/// Context a managed session is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSetup {
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
}

/// Stateful chat session owned by a [`ManagedStreamTransport`].
pub trait ManagedChat: Send {
    /// Streams the reply to `message`, one item per underlying chunk event.
    fn send_message_stream(&mut self, message: String) -> ChunkStream<'_>;
}

/// Factory for managed chat sessions.
pub trait ManagedChatBackend: Send + Sync {
    fn profile(&self) -> TransportProfile;

    fn start_chat(&self, setup: ChatSetup) -> Result<Box<dyn ManagedChat>, TransportError>;
}

pub struct ManagedStreamTransport {
    backend: Arc<dyn ManagedChatBackend>,
    chat: Option<Box<dyn ManagedChat>>,
}

impl ManagedStreamTransport {
    pub fn new(backend: Arc<dyn ManagedChatBackend>) -> Self {
        Self {
            backend,
            chat: None,
        }
    }

    /// Returns true once a session has been created and not yet reset.
    pub fn has_session(&self) -> bool {
        self.chat.is_some()
    }

    fn ensure_chat(
        &mut self,
        request: &SendRequest,
    ) -> Result<&mut Box<dyn ManagedChat>, TransportError> {
        let chat = match self.chat.take() {
            Some(chat) => chat,
            None => {
                tracing::debug!(
                    history = request.history.len(),
                    "starting managed chat session"
                );
                self.backend.start_chat(ChatSetup {
                    system_prompt: request.system_prompt.clone(),
                    history: request.history.clone(),
                })?
            }
        };
        Ok(self.chat.insert(chat))
    }
}

impl ChatTransport for ManagedStreamTransport {
    fn profile(&self) -> TransportProfile {
        self.backend.profile()
    }

    fn send(&mut self, request: SendRequest, cancel: CancelSignal) -> DeltaStream<'_> {
        if is_cancelled(&cancel) {
            return Box::pin(stream::iter([Err(TransportError::Aborted)]));
        }

        let chat = match self.ensure_chat(&request) {
            Ok(chat) => chat,
            Err(error) => return Box::pin(stream::iter([Err(error)])),
        };
        let mut chunks = chat.send_message_stream(request.message);

        Box::pin(stream! {
            loop {
                let next = match await_or_cancel(chunks.next(), &cancel).await {
                    Ok(next) => next,
                    Err(error) => {
                        yield Err(error);
                        break;
                    }
                };
                let Some(item) = next else {
                    break;
                };

                match item {
                    Ok(text) => {
                        if is_cancelled(&cancel) {
                            yield Err(TransportError::Aborted);
                            break;
                        }
                        if !text.is_empty() {
                            yield Ok(TextDelta::from(text));
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "managed chat stream failed");
                        yield Err(error);
                        break;
                    }
                }
            }
        })
    }

    fn reset(&mut self) {
        if self.chat.take().is_some() {
            tracing::debug!("managed chat session discarded");
        }
    }
}
