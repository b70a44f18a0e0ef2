//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: decides between the shell API,
//! bundle assets, pass-through and tunnelling, and writes the access log.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Body;
use hyper::header::{HeaderValue, HOST, REFERER, SERVER, USER_AGENT};
use hyper::{Method, Request, Version};

use super::assets::{self, AssetRequest};
use super::{proxy, shell_api, BoxError};
use crate::config::AppState;
use crate::http::{
    build_405_response, build_413_response, build_421_response, build_502_response,
    build_options_response, ShellResponse,
};
use crate::logger::{self, AccessLogEntry};
use crate::routing::RouteRequest;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<ShellResponse, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let start = Instant::now();
    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header_str(&req, REFERER).map(ToString::to_string);
    entry.user_agent = header_str(&req, USER_AGENT).map(ToString::to_string);

    let target = RouteRequest::from_uri(req.uri()).or_host_header(header_str(&req, HOST));
    entry.host = target.host().unwrap_or("-").to_string();

    let (mut response, route) = dispatch(req, target, &state).await;

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().lower()).unwrap_or(0);
        entry.route = route;
        entry.request_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch<B>(
    req: Request<B>,
    target: RouteRequest,
    state: &Arc<AppState>,
) -> (ShellResponse, &'static str)
where
    B: Body,
    B::Error: Into<BoxError>,
{
    // 1. Tunnels
    if req.method() == Method::CONNECT {
        return (proxy::tunnel(req, state).await, "tunnel");
    }

    // 2. Declared body size
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return (resp, "rejected");
    }

    // 3. Virtual domain: shell API, then bundle assets
    if state.router.matches(target.host()) {
        let shell = &state.config.shell;
        if shell.api_enabled {
            if let Some(route) = api_route(req.uri().path(), &shell.api_prefix) {
                let route = route.to_string();
                return (shell_api::handle(req, state, &route).await, "api");
            }
        }
        return (serve_virtual_domain(req, target, state).await, "asset");
    }

    // 4. Everything else: forward absolute-form requests
    // Resolution is a no-op for foreign hosts beyond logging the interception
    let _ = state.router.resolve(&target);
    let uri = req.uri();
    if uri.scheme().is_none() || uri.authority().is_none() {
        tracing::warn!(host = ?target.host(), path = %uri.path(), "Origin-form request for a foreign host");
        return (build_421_response(), "rejected");
    }
    if !state.config.proxy.passthrough {
        tracing::warn!(uri = %uri, "Pass-through disabled");
        return (build_502_response(), "rejected");
    }
    if uri.scheme_str() != Some("http") {
        tracing::warn!(uri = %uri, "Only http:// can be forwarded; use CONNECT for https");
        return (build_502_response(), "rejected");
    }
    (proxy::forward(req, state).await, "passthrough")
}

async fn serve_virtual_domain<B>(
    req: Request<B>,
    target: RouteRequest,
    state: &Arc<AppState>,
) -> ShellResponse {
    match *req.method() {
        Method::GET | Method::HEAD => {
            let request = AssetRequest {
                target,
                is_head: req.method() == Method::HEAD,
                if_none_match: header_str(&req, "if-none-match").map(ToString::to_string),
                range: header_str(&req, "range").map(ToString::to_string),
            };
            drop(req);
            assets::serve(state, request).await
        }
        Method::OPTIONS => build_options_response(state.config.http.enable_cors),
        _ => {
            tracing::warn!(method = %req.method(), "Method not allowed on the virtual domain");
            build_405_response()
        }
    }
}

/// Remainder of `path` below the API prefix, if it is under it
fn api_route<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn header_str<B, K: hyper::header::AsHeaderName>(req: &Request<B>, name: K) -> Option<&str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<ShellResponse> {
    let size_str = header_str(req, "content-length")?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            tracing::error!(size, max_body_size, "Request body too large");
            Some(build_413_response())
        }
        Err(_) => {
            tracing::warn!(value = size_str, "Invalid Content-Length value, skipping size check");
            None
        }
        _ => None,
    }
}
