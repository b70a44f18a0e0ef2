// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

use crate::picker::DirectoryMode;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub shell: ShellConfig,
    pub proxy: ProxyConfig,
    pub picker: PickerConfig,
    pub documents: DocumentsConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Runtime worker threads (CPU count when unset)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Log file path (stdout if not set)
    #[serde(default)]
    pub file: Option<String>,
    /// Entries kept for the log viewer
    pub buffer_capacity: usize,
    /// Capture INFO and DEBUG into the viewer buffer
    pub detailed: bool,
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    /// Zero disables keep-alive
    pub keep_alive_timeout: u64,
    /// Seconds allowed for a request's headers to arrive
    pub read_timeout: u64,
    /// Seconds a shutdown waits for open connections
    pub shutdown_grace: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
    /// `Cache-Control` sent with bundle assets
    pub cache_control: String,
}

/// Virtual domain and bundle location
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShellConfig {
    /// Hostname served from the bundle, compared case-sensitively
    pub virtual_domain: String,
    /// Directory holding the bundle
    pub asset_root: String,
    /// Prefix inside the bundle that URL paths resolve under
    pub asset_base: String,
    pub api_prefix: String,
    pub api_enabled: bool,
}

/// Forwarding of requests for other hosts
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxyConfig {
    pub passthrough: bool,
    pub allow_connect: bool,
    /// Seconds to wait for an upstream response
    pub upstream_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PickerConfig {
    pub directory_mode: DirectoryMode,
    /// Seconds a page waits on `/picker` before the request is dropped
    pub timeout_secs: u64,
    #[serde(default)]
    pub state_file: Option<String>,
}

/// Private document storage exposed through the shell API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DocumentsConfig {
    pub enabled: bool,
    pub root: String,
    pub title: String,
    pub summary: String,
}
