// Configuration module entry point
// Layered configuration (defaults, file, environment) and shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::{Result, ShellError};

pub use state::AppState;
pub use types::{
    Config, DocumentsConfig, HttpConfig, LoggingConfig, PerformanceConfig, PickerConfig,
    ProxyConfig, ServerConfig, ShellConfig,
};

/// Environment prefix: `SHELL_SERVER__PORT=9000` sets `server.port`
pub const ENV_PREFIX: &str = "SHELL";

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> std::result::Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError>
{
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("logging.buffer_capacity", 500)?
        .set_default("logging.detailed", false)?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.shutdown_grace", 10)?
        .set_default("http.server_name", "assetshell")?
        .set_default("http.enable_cors", false)?
        .set_default("http.max_body_size", 10_485_760)? // 10MB
        .set_default("http.cache_control", "no-cache")?
        .set_default("shell.virtual_domain", "mypage.test")?
        .set_default("shell.asset_root", "assets")?
        .set_default("shell.asset_base", "dist")?
        .set_default("shell.api_prefix", "/__shell")?
        .set_default("shell.api_enabled", true)?
        .set_default("proxy.passthrough", true)?
        .set_default("proxy.allow_connect", true)?
        .set_default("proxy.upstream_timeout", 30)?
        .set_default("picker.directory_mode", "return_directory")?
        .set_default("picker.timeout_secs", 300)?
        .set_default("documents.enabled", true)?
        .set_default("documents.root", "documents")?
        .set_default("documents.title", "Private Storage")?
        .set_default("documents.summary", "App's private storage")
}

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; environment variables override it.
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Built-in defaults only
    pub fn defaults() -> Result<Self> {
        Ok(with_defaults(config::Config::builder())?
            .build()?
            .try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|e: std::net::AddrParseError| ShellError::InvalidAddress {
            reason: e.to_string(),
            addr,
        })
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::DirectoryMode;

    #[test]
    fn test_defaults() {
        let config = Config::defaults().unwrap();
        assert_eq!(config.shell.virtual_domain, "mypage.test");
        assert_eq!(config.shell.asset_base, "dist");
        assert_eq!(config.shell.api_prefix, "/__shell");
        assert_eq!(config.logging.buffer_capacity, 500);
        assert!(!config.logging.detailed);
        assert_eq!(config.picker.directory_mode, DirectoryMode::ReturnDirectory);
        assert_eq!(config.documents.title, "Private Storage");
        assert!(config.logging.file.is_none());
        assert!(config.server.workers.is_none());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shell.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9090
workers = 2

[shell]
virtual_domain = "app.local"

[picker]
directory_mode = "enumerate_files"
"#,
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.shell.virtual_domain, "app.local");
        assert_eq!(config.shell.asset_base, "dist");
        assert_eq!(config.picker.directory_mode, DirectoryMode::EnumerateFiles);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config = Config::load_from("/nonexistent/assetshell-config").unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::defaults().unwrap();
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
        config.server.host = "not an ip".into();
        assert!(matches!(
            config.get_socket_addr(),
            Err(ShellError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::defaults().unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("virtual_domain = \"mypage.test\""));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.shell.asset_root, config.shell.asset_root);
    }
}
