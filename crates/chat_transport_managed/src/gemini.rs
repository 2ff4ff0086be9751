//! Managed session against the Gemini `streamGenerateContent` endpoint.
//!
//! The session keeps its own `contents` history; a turn is appended only once
//! its reply has streamed to completion.

use std::time::Duration;

use async_stream::try_stream;
use chat_transport::{
    ChatMessage, ChatRole, SseLine, SseLineBuffer, TransportError, TransportProfile,
};
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{ChatSetup, ChunkStream, ManagedChat, ManagedChatBackend};

/// Stable transport identifier used by startup selection.
pub const GEMINI_TRANSPORT_ID: &str = "gemini";

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `{base}/models/{model}:streamGenerateContent?alt=sse`
    pub fn stream_endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim().trim_end_matches('/'),
            self.model.trim()
        )
    }
}

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|error| TransportError::Network(error.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

impl ManagedChatBackend for GeminiBackend {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: GEMINI_TRANSPORT_ID.to_string(),
            model_id: self.config.model.clone(),
        }
    }

    fn start_chat(&self, setup: ChatSetup) -> Result<Box<dyn ManagedChat>, TransportError> {
        if self.config.api_key.trim().is_empty() {
            return Err(TransportError::Session("Gemini API key is not set".to_string()));
        }

        let system_instruction = Some(setup.system_prompt)
            .filter(|prompt| !prompt.trim().is_empty())
            .map(|prompt| Content::new(None, prompt));
        let contents = setup.history.iter().map(Content::from).collect();

        Ok(Box::new(GeminiChat {
            http: self.http.clone(),
            endpoint: self.config.stream_endpoint(),
            api_key: self.config.api_key.clone(),
            system_instruction,
            contents,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn new(role: Option<&str>, text: String) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: Some(text) }],
        }
    }
}

impl From<&ChatMessage> for Content {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        };
        Self::new(Some(role), message.content.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<&'a Content>,
    pub contents: &'a [Content],
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateChunk {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

struct GeminiChat {
    http: Client,
    endpoint: String,
    api_key: String,
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

impl GeminiChat {
    fn request_body(&self, pending: &[Content]) -> Result<String, TransportError> {
        let mut contents = self.contents.clone();
        contents.extend_from_slice(pending);
        serde_json::to_string(&GenerateRequest {
            system_instruction: self.system_instruction.as_ref(),
            contents: &contents,
        })
        .map_err(|error| TransportError::Session(error.to_string()))
    }
}

impl ManagedChat for GeminiChat {
    fn send_message_stream(&mut self, message: String) -> ChunkStream<'_> {
        Box::pin(try_stream! {
            let user_turn = Content::new(Some("user"), message);
            let body = self.request_body(std::slice::from_ref(&user_turn))?;

            tracing::debug!(
                endpoint = %self.endpoint,
                turns = self.contents.len() + 1,
                "sending gemini stream request"
            );

            let response = self
                .http
                .post(&self.endpoint)
                .header("content-type", "application/json")
                .header("accept", "text/event-stream")
                .header("x-goog-api-key", &self.api_key)
                .body(body)
                .send()
                .await
                .map_err(network_error)?;

            let response = check_status(response).await?;
            let mut bytes = response.bytes_stream();
            let mut lines = SseLineBuffer::default();
            let mut reply = String::new();

            'read: loop {
                let Some(chunk) = bytes.next().await else {
                    break 'read;
                };
                let chunk = chunk.map_err(network_error)?;

                for line in lines.feed(&chunk) {
                    match line {
                        SseLine::Data(payload) => {
                            if let Some(text) = decode_chunk(&payload) {
                                reply.push_str(&text);
                                yield text;
                            }
                        }
                        SseLine::Done => break 'read,
                    }
                }
            }

            for line in lines.finish() {
                if let SseLine::Data(payload) = line {
                    if let Some(text) = decode_chunk(&payload) {
                        reply.push_str(&text);
                        yield text;
                    }
                }
            }

            self.contents.push(user_turn);
            self.contents.push(Content::new(Some("model"), reply));
        })
    }
}

fn decode_chunk(payload: &str) -> Option<String> {
    match serde_json::from_str::<GenerateChunk>(payload) {
        Ok(chunk) => Some(chunk.text()).filter(|text| !text.is_empty()),
        Err(error) => {
            tracing::warn!(%error, payload, "skipping malformed gemini chunk");
            None
        }
    }
}

/// Passes a 2xx response through; anything else becomes a typed status error
/// carrying the response body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "gemini request rejected");
    Err(TransportError::from_status(status.as_u16(), body))
}

fn network_error(error: reqwest::Error) -> TransportError {
    TransportError::Network(error.to_string())
}
