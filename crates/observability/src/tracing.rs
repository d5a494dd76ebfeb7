//! Tracing/logging initialization.
//!
//! Filters come from `RUST_LOG` when set, otherwise from the configured
//! default directive. Authorization decisions are logged under the
//! `capgate::audit` target and can be filtered separately.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FORMAT: &str = "CAPGATE_LOG_FORMAT";

/// Default directive: info everywhere, denials from the audit target included.
pub const DEFAULT_FILTER: &str = "info,capgate::audit=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub format: LogFormat,
    pub default_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            format: lookup(ENV_LOG_FORMAT)
                .map(|raw| LogFormat::parse(&raw))
                .unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match config.format {
        LogFormat::Json => builder.json().with_target(true).try_init(),
        LogFormat::Pretty => builder.pretty().with_target(true).try_init(),
    };
}
