//! Transport-only client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! This crate owns request building, response classification and stream
//! decoding. Session bookkeeping and the `ChatTransport` adapter live in
//! `chat_transport_http`.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod headers;
pub mod payload;
pub mod stream;
pub mod url;

pub use client::CompletionsClient;
pub use config::CompletionsConfig;
pub use error::{CompletionsApiError, StructuredCallError};
pub use extract::{extract_json_payload, ExtractError};
pub use payload::{ChatCompletionRequest, WireMessage};
pub use stream::{DeltaDecoder, DecodedEvent};
pub use url::normalize_completions_url;
