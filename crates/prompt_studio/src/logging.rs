//! Process-wide tracing setup.

use tracing_subscriber::EnvFilter;

use crate::config::LOG_ENV_VAR;

const DEFAULT_FILTER: &str = "warn";

/// Directive string from `PROMPTSMITH_LOG`, or `warn` when unset or blank.
pub fn filter_directives() -> String {
    std::env::var(LOG_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Installs a stderr `fmt` subscriber. A second call is a no-op.
pub fn init() {
    let directives = filter_directives();
    let filter =
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
