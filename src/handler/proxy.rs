//! Pass-through for hosts other than the virtual domain
//!
//! Absolute-form `http://` requests are forwarded with the shared upstream
//! client. `CONNECT` opens a raw TCP tunnel once the connection upgrades.

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use super::{read_body, BodyError, BoxError};
use crate::config::AppState;
use crate::http::response::{
    build_403_response, build_405_response, build_413_response, build_502_response,
    build_text_response, ShellResponse,
};
use crate::routing::strip_port;

/// Headers scoped to a single connection, never forwarded
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "upgrade",
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by `Connection` are hop-by-hop too
    let named: Vec<String> = headers
        .get_all("connection")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in HOP_BY_HOP.iter().copied().chain(named.iter().map(String::as_str)) {
        headers.remove(name);
    }
    headers.remove("transfer-encoding");
}

/// Forward an absolute-form request upstream and relay the response
pub async fn forward<B>(req: Request<B>, state: &AppState) -> ShellResponse
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (mut parts, body) = req.into_parts();
    let uri = parts.uri.clone();

    let body = match read_body(body, state.config.http.max_body_size).await {
        Ok(bytes) => bytes,
        Err(BodyError::TooLarge) => return build_413_response(),
        Err(BodyError::Read(e)) => {
            tracing::warn!(uri = %uri, error = %e, "Failed to read request body");
            return build_text_response(StatusCode::BAD_REQUEST, "400 Bad Request".to_string());
        }
    };

    strip_hop_by_hop(&mut parts.headers);
    let upstream_req = Request::from_parts(parts, Full::new(body));
    let limit = Duration::from_secs(state.config.proxy.upstream_timeout);

    let exchange = async {
        let resp = state.upstream.request(upstream_req).await?;
        let (parts, body) = resp.into_parts();
        let bytes = body.collect().await?.to_bytes();
        Ok::<_, BoxError>((parts, bytes))
    };

    match tokio::time::timeout(limit, exchange).await {
        Ok(Ok((mut parts, bytes))) => {
            tracing::debug!(uri = %uri, status = parts.status.as_u16(), "Forwarded upstream");
            strip_hop_by_hop(&mut parts.headers);
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
            Response::from_parts(parts, Full::new(bytes))
        }
        Ok(Err(e)) => {
            tracing::warn!(uri = %uri, error = %e, "Upstream request failed");
            build_502_response()
        }
        Err(_) => {
            tracing::warn!(uri = %uri, timeout_secs = limit.as_secs(), "Upstream request timed out");
            build_502_response()
        }
    }
}

/// Answer a `CONNECT` request by tunnelling to its authority
pub async fn tunnel<B>(req: Request<B>, state: &AppState) -> ShellResponse {
    let Some(authority) = req.uri().authority().map(ToString::to_string) else {
        return build_text_response(StatusCode::BAD_REQUEST, "400 Bad Request".to_string());
    };

    // The virtual domain is never reachable over the network
    if state.router.matches(Some(strip_port(&authority))) {
        tracing::warn!(authority = %authority, "CONNECT to the virtual domain refused");
        return build_403_response("403 Forbidden: the virtual domain cannot be tunnelled");
    }
    if !state.config.proxy.allow_connect {
        return build_405_response();
    }

    let limit = Duration::from_secs(state.config.proxy.upstream_timeout);
    let mut server = match tokio::time::timeout(limit, TcpStream::connect(authority.as_str())).await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            tracing::warn!(authority = %authority, error = %e, "Tunnel connect failed");
            return build_502_response();
        }
        Err(_) => {
            tracing::warn!(authority = %authority, "Tunnel connect timed out");
            return build_502_response();
        }
    };

    // The tunnel keeps the connection's slot and ends when shutdown begins
    let guard = state.connections.track();
    let mut shutdown = state.connections.shutdown_receiver();
    let on_upgrade = hyper::upgrade::on(req);
    tokio::spawn(async move {
        let _guard = guard;
        let upgraded = tokio::select! {
            upgraded = on_upgrade => upgraded,
            Ok(()) = shutdown.changed() => return,
        };
        let mut client = match upgraded {
            Ok(upgraded) => TokioIo::new(upgraded),
            Err(e) => {
                tracing::warn!(authority = %authority, error = %e, "Tunnel upgrade failed");
                return;
            }
        };
        tokio::select! {
            copied = tokio::io::copy_bidirectional(&mut client, &mut server) => match copied {
                Ok((up, down)) => {
                    tracing::debug!(authority = %authority, up, down, "Tunnel closed");
                }
                Err(e) => tracing::debug!(authority = %authority, error = %e, "Tunnel error"),
            },
            Ok(()) = shutdown.changed() => {
                tracing::debug!(authority = %authority, "Tunnel closed for shutdown");
            }
        }
    });

    Response::new(Full::new(Bytes::new()))
}
