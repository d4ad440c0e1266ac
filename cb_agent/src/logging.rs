//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; the subscriber installed
//! here also captures those records, so both end up in one output.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::{self, format::DefaultFields, format::Format};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var.
///
/// # Arguments
///
/// * `log_file` - Optional file that receives a plain-text copy of every line
///
/// # Example
///
/// ```no_run
/// use cb_agent::logging;
///
/// logging::init(Some(std::path::Path::new("bot.log")));
/// tracing::info!("Agent starting");
/// ```
pub fn init(log_file: Option<&Path>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let mut file_error = None;
    let file = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(file),
        Err(e) => {
            file_error = Some(e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file.map(file_layer))
        .init();

    tracing::info!("Structured logging initialized");

    if let (Some(path), Some(e)) = (log_file, file_error) {
        tracing::warn!("Cannot write log file {}: {}", path.display(), e);
    }
}

/// Open `path` for appending, creating it if needed
pub fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Plain-text layer writing to `file`
fn file_layer<S>(file: File) -> fmt::Layer<S, DefaultFields, Format, Mutex<File>> {
    fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
}
