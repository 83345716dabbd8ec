//! Structured logging for bt-core.
//!
//! - stdout is reserved for the report
//! - stderr receives all log output, human-readable or JSONL
//! - every run gets a short run ID carried on the root span

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events are shown at the configured level.
const CRATES: [&str; 3] = ["bt_core", "bt_checks", "bt_bundle"];

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. Raw
/// `RUST_LOG` directives, when valid, replace the per-crate default filter.
pub fn init_logging(config: &LogConfig) {
    let filter = config
        .filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| default_filter(config.level));

    match config.format {
        LogFormat::Human => {
            let use_ansi = config.color && std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .init();
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .init();
        }
    }
}

fn default_filter(level: LogLevel) -> EnvFilter {
    let directives: Vec<String> = CRATES.iter().map(|krate| format!("{krate}={level}")).collect();
    EnvFilter::new(directives.join(","))
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // Shorten to first 12 hex chars for readability
    format!("run-{}", &uuid.simple().to_string()[..12])
}
