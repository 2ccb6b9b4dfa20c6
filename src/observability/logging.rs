//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable through `RUST_LOG`
//! - Optionally surface every resolution step of the dispatch driver
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Logs go to stderr so `routes` output on stdout stays clean

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Filter directives derived from the configuration.
pub fn filter_directives(config: &ObservabilityConfig) -> String {
    let level = config.log_level.to_lowercase();
    let mut directives = format!("resource_dispatch={},tower_http={}", level, level);
    if config.trace_resolution {
        directives.push_str(",resource_dispatch::dispatch=trace");
    }
    directives
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        let mut config = ObservabilityConfig::default();
        assert_eq!(filter_directives(&config), "resource_dispatch=info,tower_http=info");

        config.log_level = "DEBUG".into();
        config.trace_resolution = true;
        assert_eq!(
            filter_directives(&config),
            "resource_dispatch=debug,tower_http=debug,resource_dispatch::dispatch=trace"
        );
    }
}
