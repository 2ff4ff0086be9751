use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("reply contains no JSON object")]
    NoJsonObject,

    #[error("reply contains malformed JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("reply JSON has an unexpected shape: {0}")]
    UnexpectedShape(#[source] serde_json::Error),
}

/// Pulls a JSON object out of free-form model output.
///
/// A ```` ```json ```` fenced block wins when present; otherwise the text
/// between the first `{` and the last `}` is parsed.
pub fn extract_json_payload(content: &str) -> Result<Value, ExtractError> {
    let candidate = fenced_json(content)
        .or_else(|| braced_span(content))
        .ok_or(ExtractError::NoJsonObject)?;

    serde_json::from_str(candidate).map_err(ExtractError::InvalidJson)
}

/// [`extract_json_payload`] followed by typed deserialization.
pub fn extract_structured<T: DeserializeOwned>(content: &str) -> Result<T, ExtractError> {
    let value = extract_json_payload(content)?;
    serde_json::from_value(value).map_err(ExtractError::UnexpectedShape)
}

fn fenced_json(content: &str) -> Option<&str> {
    let start = content.find(JSON_FENCE)? + JSON_FENCE.len();
    let rest = &content[start..];
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

fn braced_span(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}
