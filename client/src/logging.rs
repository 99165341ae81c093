//! # Structured Logging
//!
//! Initializes the `tracing` subscriber with a pretty or JSON formatter and
//! `RUST_LOG` filtering.
//!
//! Log output goes to stderr. Stdout is reserved for command output (signed
//! transactions as hex, query results as JSON) so it can be piped.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormatArg;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "tessera=info,tessera_protocol=info";

/// Initialize the global tracing subscriber. Call once, early in `main()`.
///
/// `RUST_LOG` overrides `default_level` when set:
///
/// ```text
/// RUST_LOG=tessera=debug,tessera_protocol=debug
/// ```
pub fn init_logging(default_level: &str, format: LogFormatArg) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormatArg::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_file(false),
                )
                .init();
        }
        LogFormatArg::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .init();
        }
    }

    tracing::debug!(?format, "logging initialized");
}
