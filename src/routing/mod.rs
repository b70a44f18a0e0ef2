//! Routing module
//!
//! Virtual-domain interception:
//! - Route request extraction from URLs, URIs and `Host` headers
//! - Asset resolution against the bundle, with 404/500 diagnostics

mod request;
mod router;

pub use request::{strip_port, RouteRequest};
pub use router::{AssetResponse, AssetRouter, RouteResult, ENCODING, INDEX_PATH};
