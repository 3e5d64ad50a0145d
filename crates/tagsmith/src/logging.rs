//! Logging initialization.
//!
//! All log output goes to stderr; stdout is reserved for exported results and
//! for the tags printed by `tagsmith read`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the default filter directive for a log level.
///
/// ONNX Runtime logs every graph optimization at info level through `ort`,
/// so it is held at `warn` unless tracing is requested explicitly.
fn default_directive(level: &str) -> String {
    let level = match level {
        "error" | "warn" | "info" | "debug" | "trace" => level,
        _ => "info",
    };
    let ort = if level == "trace" { "trace" } else { "warn" };
    format!("{level},ort={ort}")
}

/// Initialize the logging subsystem.
///
/// `RUST_LOG`, when set, replaces the level-derived filter entirely.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config table.
///
/// `--verbose` raises the level to at least `debug`; `--json-logs` forces the
/// JSON layer.
pub fn init_from_config(
    config: &tagsmith_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = match config.logging.level.as_str() {
        "trace" => "trace",
        _ if verbose_override => "debug",
        other => other,
    };
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}
