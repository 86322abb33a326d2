use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use super::TracingConfig;

/// Initialize the tracing subscriber with structured logging on stderr.
///
/// Stdout carries answers only, so every log line goes to stderr.
pub fn init_tracing(config: &TracingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let result = if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(config.verbose)
                    .with_file(config.verbose)
                    .with_line_number(config.verbose),
            )
            .try_init()
    };

    // A subscriber installed earlier (tests) keeps precedence.
    if result.is_ok() {
        tracing::debug!(
            environment = %config.environment,
            json_format = config.json_format,
            verbose = config.verbose,
            "Tracing initialized"
        );
    }
}
