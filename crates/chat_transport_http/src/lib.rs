//! `ChatTransport` over an OpenAI-compatible streaming HTTP endpoint.
//!
//! Every send is one stateless request carrying the full history; the
//! transport keeps no conversation state of its own.

use async_stream::stream;
use chat_transport::{
    CancelSignal, ChatTransport, DeltaStream, SendRequest, TextDelta, TransportError,
    TransportProfile,
};
use completions_api::{
    ChatCompletionRequest, CompletionsApiError, CompletionsClient, CompletionsConfig,
};
use futures_util::StreamExt;

/// Stable transport identifier used by startup selection.
pub const HTTP_SSE_TRANSPORT_ID: &str = "http";

#[derive(Debug, Clone)]
pub struct HttpSseTransport {
    client: CompletionsClient,
}

impl HttpSseTransport {
    pub fn new(config: CompletionsConfig) -> Result<Self, TransportError> {
        let client = CompletionsClient::new(config).map_err(map_init_error)?;
        Ok(Self { client })
    }

    pub fn from_client(client: CompletionsClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CompletionsClient {
        &self.client
    }

    fn completion_request(&self, request: &SendRequest) -> ChatCompletionRequest {
        ChatCompletionRequest::for_turn(
            self.client.config().model.clone(),
            &request.system_prompt,
            &request.history,
            &request.message,
        )
    }
}

impl ChatTransport for HttpSseTransport {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: HTTP_SSE_TRANSPORT_ID.to_string(),
            model_id: self.client.config().model.clone(),
        }
    }

    fn send(&mut self, request: SendRequest, cancel: CancelSignal) -> DeltaStream<'_> {
        let completion = self.completion_request(&request);
        let client = &self.client;

        Box::pin(stream! {
            let deltas = client.stream_chat(completion, cancel);
            futures_util::pin_mut!(deltas);

            while let Some(item) = deltas.next().await {
                match item {
                    Ok(text) => yield Ok(TextDelta::from(text)),
                    Err(error) => {
                        let error = TransportError::from(error);
                        if !error.is_aborted() {
                            tracing::warn!(%error, "http stream failed");
                        }
                        yield Err(error);
                        break;
                    }
                }
            }
        })
    }
}

fn map_init_error(error: CompletionsApiError) -> TransportError {
    TransportError::Network(format!("failed to initialize HTTP client: {error}"))
}
