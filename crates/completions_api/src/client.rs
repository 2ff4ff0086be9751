use std::future::Future;

use async_stream::try_stream;
use chat_transport::{is_cancelled, CancelSignal};
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::CompletionsConfig;
use crate::error::{CompletionsApiError, StructuredCallError};
use crate::extract::{extract_structured, ExtractError};
use crate::headers::build_headers;
use crate::payload::{ChatCompletionRequest, CompletionResponse};
use crate::stream::{DecodedEvent, DeltaDecoder};
use crate::url::normalize_completions_url;

#[derive(Debug, Clone)]
pub struct CompletionsClient {
    http: Client,
    config: CompletionsConfig,
}

impl CompletionsClient {
    pub fn new(config: CompletionsConfig) -> Result<Self, CompletionsApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(CompletionsApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CompletionsConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        normalize_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self, streaming: bool) -> Result<HeaderMap, CompletionsApiError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config, streaming) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    CompletionsApiError::InvalidHeader(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    CompletionsApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, CompletionsApiError> {
        let streaming = request.stream.unwrap_or(false);
        let headers = self.build_headers(streaming)?;
        Ok(self
            .http
            .post(self.endpoint())
            .headers(headers)
            .json(request))
    }

    /// Issues one request and classifies a non-2xx status before any body is read.
    pub async fn send(
        &self,
        request: &ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<Response, CompletionsApiError> {
        if is_cancelled(cancel) {
            return Err(CompletionsApiError::Cancelled);
        }

        tracing::debug!(
            endpoint = %self.endpoint(),
            model = %request.model,
            messages = request.messages.len(),
            streaming = request.stream.unwrap_or(false),
            "sending chat completion request"
        );

        let response = self.build_request(request)?.send();
        let response = await_or_cancel(response, cancel).await??;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = await_or_cancel(response.text(), cancel)
            .await?
            .unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "chat completion request rejected");
        Err(CompletionsApiError::from_status(status, body))
    }

    /// Streams content deltas of one completion in arrival order.
    ///
    /// The stream ends at `data: [DONE]` or end-of-body and yields at most one
    /// error, after which it stops.
    pub fn stream_chat<'a>(
        &'a self,
        request: ChatCompletionRequest,
        cancel: CancelSignal,
    ) -> impl Stream<Item = Result<String, CompletionsApiError>> + Send + 'a {
        try_stream! {
            let request = request.streaming();
            let response = self.send(&request, &cancel).await?;
            let mut body = response.bytes_stream();
            let mut decoder = DeltaDecoder::default();

            'read: loop {
                let Some(chunk) = await_or_cancel(body.next(), &cancel).await? else {
                    break 'read;
                };
                let chunk = chunk?;
                if is_cancelled(&cancel) {
                    Err::<(), _>(CompletionsApiError::Cancelled)?;
                }

                for event in decoder.feed(&chunk) {
                    match event {
                        DecodedEvent::Delta(text) => yield text,
                        DecodedEvent::Done => break 'read,
                    }
                }
            }

            for event in decoder.finish() {
                if let DecodedEvent::Delta(text) = event {
                    yield text;
                }
            }
        }
    }

    /// Runs the one-shot variant and returns `choices[0].message.content`.
    pub async fn complete(
        &self,
        request: ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<String, CompletionsApiError> {
        let mut request = request;
        request.stream = None;

        let response = self.send(&request, cancel).await?;
        let text = await_or_cancel(response.text(), cancel).await??;
        let parsed: CompletionResponse = serde_json::from_str(&text)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionsApiError::EmptyCompletion)
    }

    /// One-shot call whose reply must contain a JSON object of type `T`.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        request: ChatCompletionRequest,
        cancel: &CancelSignal,
    ) -> Result<T, StructuredCallError> {
        let content = match self.complete(request, cancel).await {
            Ok(content) => content,
            Err(CompletionsApiError::EmptyCompletion) => {
                return Err(StructuredCallError::InvalidPayload(ExtractError::NoJsonObject));
            }
            Err(error) => return Err(StructuredCallError::Unreachable(error)),
        };

        extract_structured(&content).map_err(|error| {
            tracing::warn!(%error, "structured reply could not be parsed");
            StructuredCallError::InvalidPayload(error)
        })
    }
}

async fn await_or_cancel<F>(
    future: F,
    cancel: &CancelSignal,
) -> Result<F::Output, CompletionsApiError>
where
    F: Future,
{
    chat_transport::await_or_cancel(future, cancel)
        .await
        .map_err(|_| CompletionsApiError::Cancelled)
}
