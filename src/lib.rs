//! Virtual-domain asset host for embedded browser shells
//!
//! Requests for the configured virtual domain are answered from a bundle on
//! disk; everything else is passed through or tunnelled. A small JSON API
//! under the shell prefix exposes the log viewer, the file picker broker and
//! private document storage to the page.

pub mod assets;
pub mod config;
pub mod documents;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod picker;
pub mod routing;
pub mod server;

pub use error::{Result, ShellError};
