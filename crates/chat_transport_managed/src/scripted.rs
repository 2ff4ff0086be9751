//! Deterministic managed backend for tests and offline runs.
//!
//! Replies are consumed in order across every session the backend creates;
//! when the script runs dry the user message is echoed back word by word.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_stream::stream;
use chat_transport::{TransportError, TransportProfile};

use crate::{ChatSetup, ChunkStream, ManagedChat, ManagedChatBackend};

/// Stable transport identifier used by startup selection.
pub const SCRIPTED_TRANSPORT_ID: &str = "scripted";

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Chunks(Vec<String>),
    /// Emits `chunks`, then fails with `error`.
    Fail {
        chunks: Vec<String>,
        error: TransportError,
    },
}

impl ScriptedReply {
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    fn echo(message: &str) -> Self {
        Self::Chunks(message.split_inclusive(' ').map(ToString::to_string).collect())
    }

    fn into_parts(self) -> (Vec<String>, Option<TransportError>) {
        match self {
            Self::Chunks(chunks) => (chunks, None),
            Self::Fail { chunks, error } => (chunks, Some(error)),
        }
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: Mutex<VecDeque<ScriptedReply>>,
    setups: Mutex<Vec<ChatSetup>>,
    received: Mutex<Vec<String>>,
}

/// Cloneable handle; clones share the script and the recorded calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<ScriptState>,
    chunk_delay: Duration,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            state: Arc::new(ScriptState {
                replies: Mutex::new(replies.into()),
                ..ScriptState::default()
            }),
            chunk_delay: Duration::ZERO,
        }
    }

    /// Sleeps before every chunk so cancellation can land mid-stream.
    #[must_use]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn push_reply(&self, reply: ScriptedReply) {
        lock_unpoisoned(&self.state.replies).push_back(reply);
    }

    /// Number of sessions created so far.
    pub fn sessions_started(&self) -> usize {
        lock_unpoisoned(&self.state.setups).len()
    }

    /// Setup of every created session, in creation order.
    pub fn setups(&self) -> Vec<ChatSetup> {
        lock_unpoisoned(&self.state.setups).clone()
    }

    /// Every message sent through any session, in send order.
    pub fn received_messages(&self) -> Vec<String> {
        lock_unpoisoned(&self.state.received).clone()
    }
}

impl ManagedChatBackend for ScriptedBackend {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: SCRIPTED_TRANSPORT_ID.to_string(),
            model_id: "scripted".to_string(),
        }
    }

    fn start_chat(&self, setup: ChatSetup) -> Result<Box<dyn ManagedChat>, TransportError> {
        lock_unpoisoned(&self.state.setups).push(setup);
        Ok(Box::new(ScriptedChat {
            state: Arc::clone(&self.state),
            chunk_delay: self.chunk_delay,
        }))
    }
}

struct ScriptedChat {
    state: Arc<ScriptState>,
    chunk_delay: Duration,
}

impl ManagedChat for ScriptedChat {
    fn send_message_stream(&mut self, message: String) -> ChunkStream<'_> {
        let reply = lock_unpoisoned(&self.state.replies)
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::echo(&message));
        lock_unpoisoned(&self.state.received).push(message);

        let delay = self.chunk_delay;
        let (chunks, failure) = reply.into_parts();

        Box::pin(stream! {
            for chunk in chunks {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(chunk);
            }
            if let Some(error) = failure {
                yield Err(error);
            }
        })
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
