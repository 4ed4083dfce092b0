//! Logging setup
//!
//! The engine logs through `tracing`: run start/finish at `info`, per-item
//! progress at `trace` (or `debug` when the context is verbose), dropped
//! items at `warn` and failures at `error`. Binaries and tests install a
//! subscriber with [`init_tracing`].

use crate::error::{ProcessorError, Result};
use feedpipe_config::ObservabilityConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter for the configured level; `RUST_LOG` takes precedence when set
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.log_level.to_lowercase();
        EnvFilter::new(format!("feedpipe_processor={},warn", level))
    })
}

/// Install the global subscriber: human-readable or JSON lines.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let installed = if config.json_logging {
        registry
            .with(fmt::layer().json().with_target(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    installed.map_err(|err| ProcessorError::Telemetry {
        reason: err.to_string(),
    })
}
