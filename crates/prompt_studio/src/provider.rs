//! Transport selection, done once when a session is constructed.

use std::sync::Arc;

use anyhow::{bail, Context};
use chat_transport::ChatTransport;
use chat_transport_http::HttpSseTransport;
use chat_transport_managed::{GeminiBackend, GeminiConfig, ManagedStreamTransport, ScriptedBackend};
use completions_api::{CompletionsClient, CompletionsConfig};

use crate::config::{ProviderKind, StudioConfig, API_KEY_ENV_VAR};

pub fn completions_config(config: &StudioConfig) -> CompletionsConfig {
    let mut completions = CompletionsConfig::default();
    if let Some(base_url) = &config.base_url {
        completions.base_url = base_url.clone();
    }
    if let Some(model) = &config.model {
        completions.model = model.clone();
    }
    completions.api_key = config.api_key.clone();
    completions.timeout = config.timeout;
    completions
}

pub fn gemini_config(config: &StudioConfig) -> anyhow::Result<GeminiConfig> {
    let Some(api_key) = &config.api_key else {
        bail!("the gemini provider needs {API_KEY_ENV_VAR}");
    };
    let mut gemini = GeminiConfig::new(api_key.clone());
    if let Some(base_url) = &config.base_url {
        gemini = gemini.with_base_url(base_url.clone());
    }
    if let Some(model) = &config.model {
        gemini = gemini.with_model(model.clone());
    }
    if let Some(timeout) = config.timeout {
        gemini = gemini.with_timeout(timeout);
    }
    Ok(gemini)
}

pub fn transport_from_config(config: &StudioConfig) -> anyhow::Result<Box<dyn ChatTransport>> {
    let transport: Box<dyn ChatTransport> = match config.provider {
        ProviderKind::Http => Box::new(
            HttpSseTransport::new(completions_config(config))
                .context("failed to build HTTP transport")?,
        ),
        ProviderKind::Gemini => {
            let backend = GeminiBackend::new(gemini_config(config)?)
                .context("failed to build Gemini client")?;
            Box::new(ManagedStreamTransport::new(Arc::new(backend)))
        }
        ProviderKind::Scripted => {
            Box::new(ManagedStreamTransport::new(Arc::new(ScriptedBackend::default())))
        }
    };

    let profile = transport.profile();
    tracing::info!(
        transport = %profile.transport_id,
        model = %profile.model_id,
        "chat transport selected"
    );
    Ok(transport)
}

/// One-shot client for structured calls; only the HTTP provider offers them.
pub fn completions_client(config: &StudioConfig) -> anyhow::Result<CompletionsClient> {
    if config.provider != ProviderKind::Http {
        bail!(
            "structured calls need the http provider; current provider is {}",
            config.provider
        );
    }
    CompletionsClient::new(completions_config(config)).context("failed to build HTTP client")
}
