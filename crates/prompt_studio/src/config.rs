//! Environment configuration.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

pub const PROVIDER_ENV_VAR: &str = "PROMPTSMITH_PROVIDER";
pub const BASE_URL_ENV_VAR: &str = "PROMPTSMITH_BASE_URL";
pub const API_KEY_ENV_VAR: &str = "PROMPTSMITH_API_KEY";
pub const MODEL_ENV_VAR: &str = "PROMPTSMITH_MODEL";
pub const TIMEOUT_ENV_VAR: &str = "PROMPTSMITH_TIMEOUT_SECS";
pub const LOG_ENV_VAR: &str = "PROMPTSMITH_LOG";

/// Which chat transport a session is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// OpenAI-compatible `/chat/completions` over SSE.
    #[default]
    Http,
    /// Managed Gemini chat session.
    Gemini,
    /// Offline scripted backend that echoes input.
    Scripted,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Gemini => "gemini",
            Self::Scripted => "scripted",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "gemini" => Ok(Self::Gemini),
            "scripted" => Ok(Self::Scripted),
            unknown => bail!(
                "Unsupported provider '{unknown}'. Available providers: http, gemini, scripted"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudioConfig {
    pub provider: ProviderKind,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

impl StudioConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let provider = match env_string_opt(PROVIDER_ENV_VAR) {
            Some(value) => value.parse()?,
            None => ProviderKind::default(),
        };
        let timeout = match env_string_opt(TIMEOUT_ENV_VAR) {
            Some(value) => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("{TIMEOUT_ENV_VAR} must be whole seconds"))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            provider,
            base_url: env_string_opt(BASE_URL_ENV_VAR),
            api_key: env_string_opt(API_KEY_ENV_VAR),
            model: env_string_opt(MODEL_ENV_VAR),
            timeout,
        })
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
