use std::collections::BTreeMap;

use crate::config::CompletionsConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_USER_AGENT: &str = "user-agent";

const DEFAULT_USER_AGENT: &str = concat!("promptsmith/", env!("CARGO_PKG_VERSION"));

/// Build a deterministic header map for one completions request.
///
/// `authorization` is only present when a non-blank API key is configured.
pub fn build_headers(config: &CompletionsConfig, streaming: bool) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );
    let accept = if streaming {
        "text/event-stream"
    } else {
        "application/json"
    };
    headers.insert(HEADER_ACCEPT.to_owned(), accept.to_owned());

    if let Some(api_key) = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {api_key}"));
    }

    let ua = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua.to_owned());

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_authorization_without_key() {
        let headers = build_headers(&CompletionsConfig::default(), true);
        assert!(!headers.contains_key(HEADER_AUTHORIZATION));
        assert_eq!(headers[HEADER_ACCEPT], "text/event-stream");
        assert_eq!(headers[HEADER_CONTENT_TYPE], "application/json");
    }

    #[test]
    fn blank_key_is_treated_as_missing() {
        let config = CompletionsConfig::default().with_api_key("   ");
        assert!(!build_headers(&config, false).contains_key(HEADER_AUTHORIZATION));
    }

    #[test]
    fn bearer_key_and_extra_headers_are_merged() {
        let config = CompletionsConfig::default()
            .with_api_key(" sk-test ")
            .insert_header("X-Org", " acme ");
        let headers = build_headers(&config, false);

        assert_eq!(headers[HEADER_AUTHORIZATION], "Bearer sk-test");
        assert_eq!(headers[HEADER_ACCEPT], "application/json");
        assert_eq!(headers["x-org"], "acme");
    }
}
