//! HTTP protocol layer module
//!
//! Protocol helpers shared by asset serving, the shell API and pass-through:
//! MIME table, cache validation, byte ranges and response builders.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

pub use mime::{mime_for, mime_for_path};
pub use response::{
    build_304_response, build_403_response, build_405_response, build_413_response,
    build_416_response, build_421_response, build_502_response, build_options_response,
    json_error, json_response, ShellResponse,
};
