//! Tracing subscriber setup for the CLI.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

/// Parse a verbosity name, falling back to info.
pub fn parse_level(verbosity: &str) -> Level {
    match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber.
///
/// Logs go to stdout as text or JSON. When `log_file` is given, a plain-text
/// copy is appended there too; the returned handle should be synced before
/// exit.
pub fn init(level: Level, format: &str, log_file: Option<&Path>) -> Result<Option<Arc<File>>, String> {
    let stdout: Box<dyn Layer<Registry> + Send + Sync> = if format == "json" {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(false)
            .boxed()
    } else {
        fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(false)
            .boxed()
    };

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("cannot open log file {}: {}", path.display(), e))?;
            Some(Arc::new(file))
        }
        None => None,
    };

    let file_layer = file.clone().map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(stdout)
        .with(file_layer)
        .with(LevelFilter::from_level(level))
        .try_init()
        .map_err(|e| e.to_string())?;

    Ok(file)
}
