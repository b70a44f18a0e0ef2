//! Application error type
//!
//! Everything outside the asset router reports failures through `ShellError`.
//! The router itself is total and never returns one.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("document already exists: {0}")]
    DocumentExists(String),

    #[error("invalid document id or name: {0}")]
    InvalidDocument(String),

    #[error("unknown open mode: {0}")]
    InvalidOpenMode(String),

    #[error("no pending pick with id {0}")]
    UnknownPick(u64),

    #[error("failed to launch picker: {0}")]
    PickerLaunch(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
