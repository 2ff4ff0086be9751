use chat_transport::ChatMessage;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::SessionError;

/// Notice attached to one model message, such as a cancelled reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnNotice {
    /// Index into the transcript's messages.
    pub message_index: usize,
    pub notice: String,
}

/// Immutable record of a chat session at the moment it was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    pub id: Uuid,
    /// RFC3339 UTC timestamp.
    pub created_at: String,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<TurnNotice>,
}

impl ChatSnapshot {
    pub(crate) fn capture(
        system_prompt: &str,
        messages: &[ChatMessage],
        notices: &[TurnNotice],
    ) -> Result<Self, SessionError> {
        Ok(Self {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            system_prompt: system_prompt.to_owned(),
            messages: messages.to_vec(),
            notices: notices.to_vec(),
        })
    }
}
