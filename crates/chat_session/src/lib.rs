//! Folds transport deltas into a chat transcript.
//!
//! A session is `Idle` or `Sending`. Starting a send appends the user message
//! and an empty model placeholder; every delta is appended to that placeholder
//! in arrival order, and completion, failure or abort fixes its content and
//! returns the session to `Idle`. An abort leaves the streamed text untouched
//! and records the cancellation notice against the placeholder instead.

mod error;
mod snapshot;

use chat_transport::{
    is_cancelled, CancelSignal, ChatMessage, ChatRole, ChatTransport, SendRequest, TextDelta,
    TransportError, TransportProfile,
};
use futures_util::StreamExt;

pub use error::SessionError;
pub use snapshot::{ChatSnapshot, TurnNotice};

/// Notice reported when the user cancels a streaming reply.
pub const ABORT_NOTICE: &str = "Response stopped by user.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
}

/// How one send ended. The transcript already reflects the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Failed { error: TransportError },
    Aborted { notice: String },
}

#[derive(Debug)]
struct Transcript {
    system_prompt: String,
    messages: Vec<ChatMessage>,
    notices: Vec<TurnNotice>,
    state: SessionState,
}

impl Transcript {
    fn begin_send(&mut self, text: &str) -> Result<SendRequest, SessionError> {
        if self.state == SessionState::Sending {
            return Err(SessionError::SendInFlight);
        }
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let request = SendRequest::new(text, self.messages.clone(), self.system_prompt.clone());
        self.messages.push(ChatMessage::user(text));
        self.messages.push(ChatMessage::model(String::new()));
        self.state = SessionState::Sending;
        Ok(request)
    }

    fn placeholder(&mut self) -> Result<&mut ChatMessage, SessionError> {
        if self.state != SessionState::Sending {
            return Err(SessionError::NotSending);
        }
        match self.messages.last_mut() {
            Some(message) if message.role == ChatRole::Model => Ok(message),
            _ => Err(SessionError::NotSending),
        }
    }

    fn apply_delta(&mut self, delta: &TextDelta) -> Result<&ChatMessage, SessionError> {
        let placeholder = self.placeholder()?;
        placeholder.content.push_str(delta.as_str());
        Ok(placeholder)
    }

    fn complete(&mut self) -> Result<(), SessionError> {
        self.placeholder()?;
        self.state = SessionState::Idle;
        Ok(())
    }

    fn fail(&mut self, error: &TransportError) -> Result<(), SessionError> {
        let placeholder = self.placeholder()?;
        if !placeholder.content.is_empty() {
            placeholder.content.push_str("\n\n");
        }
        placeholder.content.push_str(&format!("Error: {error}"));
        self.state = SessionState::Idle;
        Ok(())
    }

    fn abort(&mut self) -> Result<String, SessionError> {
        self.placeholder()?;
        self.notices.push(TurnNotice {
            message_index: self.messages.len() - 1,
            notice: ABORT_NOTICE.to_string(),
        });
        self.state = SessionState::Idle;
        Ok(ABORT_NOTICE.to_string())
    }
}

/// Aborts the open turn if a send future is dropped before it settles.
struct SendGuard<'a> {
    transcript: &'a mut Transcript,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        if self.transcript.state == SessionState::Sending {
            tracing::debug!("chat send dropped mid-stream");
            let _ = self.transcript.abort();
        }
    }
}

/// One open chat session bound to the transport chosen at construction.
pub struct ChatSessionAccumulator {
    transport: Box<dyn ChatTransport>,
    transcript: Transcript,
}

impl ChatSessionAccumulator {
    pub fn new(transport: Box<dyn ChatTransport>, system_prompt: impl Into<String>) -> Self {
        Self {
            transport,
            transcript: Transcript {
                system_prompt: system_prompt.into(),
                messages: Vec::new(),
                notices: Vec::new(),
                state: SessionState::Idle,
            },
        }
    }

    pub fn profile(&self) -> TransportProfile {
        self.transport.profile()
    }

    pub fn state(&self) -> SessionState {
        self.transcript.state
    }

    pub fn system_prompt(&self) -> &str {
        &self.transcript.system_prompt
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.transcript.messages
    }

    /// Notices recorded against model messages, oldest first.
    pub fn notices(&self) -> &[TurnNotice] {
        &self.transcript.notices
    }

    /// Appends the user message and an empty model placeholder.
    ///
    /// The returned request carries the history as it was before this send.
    pub fn begin_send(&mut self, text: &str) -> Result<SendRequest, SessionError> {
        self.transcript.begin_send(text)
    }

    /// Appends `delta` to the placeholder and returns the updated message.
    pub fn apply_delta(&mut self, delta: &TextDelta) -> Result<&ChatMessage, SessionError> {
        self.transcript.apply_delta(delta)
    }

    pub fn complete(&mut self) -> Result<(), SessionError> {
        self.transcript.complete()
    }

    /// Writes a visible error line into the placeholder.
    pub fn fail(&mut self, error: &TransportError) -> Result<(), SessionError> {
        self.transcript.fail(error)
    }

    /// Leaves the placeholder as streamed, records the cancellation notice
    /// against it and returns the notice.
    pub fn abort(&mut self) -> Result<String, SessionError> {
        self.transcript.abort()
    }

    /// Streams one reply into the transcript.
    ///
    /// `on_update` sees the placeholder after every applied delta. Transport
    /// failures and cancellation end up in the outcome; only misuse of the
    /// session is returned as `Err`. Dropping the future mid-stream aborts the
    /// turn, so the session is `Idle` again afterwards.
    pub async fn send<F>(
        &mut self,
        text: &str,
        cancel: CancelSignal,
        mut on_update: F,
    ) -> Result<SendOutcome, SessionError>
    where
        F: FnMut(&ChatMessage),
    {
        let request = self.transcript.begin_send(text)?;
        let mut guard = SendGuard {
            transcript: &mut self.transcript,
        };
        tracing::debug!(
            transport = %self.transport.profile().transport_id,
            history = request.history.len(),
            "chat send started"
        );

        let mut deltas = self.transport.send(request, cancel.clone());
        let mut failure = None;
        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    if is_cancelled(&cancel) {
                        failure = Some(TransportError::Aborted);
                        break;
                    }
                    let message = guard.transcript.apply_delta(&delta)?;
                    on_update(message);
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        drop(deltas);

        match failure {
            None => {
                guard.transcript.complete()?;
                Ok(SendOutcome::Completed)
            }
            Some(TransportError::Aborted) => {
                tracing::debug!("chat send aborted");
                let notice = guard.transcript.abort()?;
                Ok(SendOutcome::Aborted { notice })
            }
            Some(error) => {
                tracing::warn!(%error, "chat send failed");
                guard.transcript.fail(&error)?;
                if let Some(message) = guard.transcript.messages.last() {
                    on_update(message);
                }
                Ok(SendOutcome::Failed { error })
            }
        }
    }

    /// Captures the current transcript.
    pub fn snapshot(&self) -> Result<ChatSnapshot, SessionError> {
        ChatSnapshot::capture(
            &self.transcript.system_prompt,
            &self.transcript.messages,
            &self.transcript.notices,
        )
    }

    /// Drops every message and any conversation state held by the transport.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        if self.transcript.state == SessionState::Sending {
            return Err(SessionError::SendInFlight);
        }
        self.transcript.messages.clear();
        self.transcript.notices.clear();
        self.transport.reset();
        tracing::debug!("chat session cleared");
        Ok(())
    }
}
