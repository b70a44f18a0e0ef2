//! Logger module
//!
//! Builds the global `tracing` subscriber:
//! - `EnvFilter` from `RUST_LOG`, falling back to `logging.level`
//! - `fmt` output to stdout, or appended to `logging.file`
//! - a capture layer feeding the in-memory `LogBuffer` behind the log viewer
//!
//! Access log lines go through `tracing` under the `access` target.

mod buffer;
mod format;
mod layer;

pub use buffer::{LogBuffer, LogEntry};
pub use format::AccessLogEntry;
pub use layer::CaptureLayer;

use std::fs::{File, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LoggingConfig};

/// Install the global subscriber; call once at startup
pub fn init(config: &LoggingConfig, buffer: &LogBuffer) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(CaptureLayer::new(buffer.clone()));

    let result = match config.file.as_deref() {
        Some(path) => {
            let file = open_log_file(path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        None => registry.with(fmt::layer()).try_init(),
    };
    result.map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))
}

/// Route panics into the log so they reach the viewer
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(target: "panic", "Uncaught panic: {info}");
    }));
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("Asset shell listening on http://{addr}");
    tracing::info!(
        virtual_domain = %config.shell.virtual_domain,
        asset_root = %config.shell.asset_root,
        asset_base = %config.shell.asset_base,
        "Serving bundle"
    );
    if config.shell.api_enabled {
        tracing::info!(prefix = %config.shell.api_prefix, "Shell API enabled");
    }
    if config.proxy.passthrough {
        tracing::info!(connect = config.proxy.allow_connect, "Pass-through enabled");
    }
    if let Some(workers) = config.server.workers {
        tracing::info!(workers, "Worker threads");
    }
}

/// Write one access log line when access logging is on
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}
