//! HTTP response building module
//!
//! Builders for the status codes the shell produces. Builders never fail:
//! a header that hyper rejects is logged and an empty response returned.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

pub type ShellResponse = Response<Full<Bytes>>;

/// Escape text for insertion into HTML element content or attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `Content-Type` header value, with a charset for textual types
pub fn content_type_header(mime: &str, encoding: &str) -> String {
    if super::mime::is_text(mime) {
        format!("{mime}; charset={}", encoding.to_ascii_lowercase())
    } else {
        mime.to_string()
    }
}

fn plain(status: StatusCode, text: &'static str) -> ShellResponse {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(text.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from_static(text.as_bytes())))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> ShellResponse {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::NOT_MODIFIED, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 403 Forbidden response
pub fn build_403_response(text: &'static str) -> ShellResponse {
    plain(StatusCode::FORBIDDEN, text)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> ShellResponse {
    let mut resp = plain(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    resp.headers_mut().insert(
        hyper::header::ALLOW,
        hyper::header::HeaderValue::from_static("GET, HEAD, OPTIONS"),
    );
    resp
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> ShellResponse {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", "GET, HEAD, OPTIONS");

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Range")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error(StatusCode::NO_CONTENT, &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> ShellResponse {
    plain(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(total: usize) -> ShellResponse {
    let mut resp = plain(StatusCode::RANGE_NOT_SATISFIABLE, "416 Range Not Satisfiable");
    if let Ok(v) = hyper::header::HeaderValue::from_str(&format!("bytes */{total}")) {
        resp.headers_mut().insert(hyper::header::CONTENT_RANGE, v);
    }
    resp
}

/// Build 421 Misdirected Request response
pub fn build_421_response() -> ShellResponse {
    plain(
        StatusCode::MISDIRECTED_REQUEST,
        "421 Misdirected Request: this host only serves its virtual domain",
    )
}

/// Build 502 Bad Gateway response
pub fn build_502_response() -> ShellResponse {
    plain(StatusCode::BAD_GATEWAY, "502 Bad Gateway")
}

/// Build a response around a routed asset body
///
/// Covers success (with `ETag`) as well as the 404/500 diagnostic pages.
pub fn build_asset_response(
    status: StatusCode,
    content_type: &str,
    etag: Option<&str>,
    cache_control: &str,
    body: Bytes,
    is_head: bool,
) -> ShellResponse {
    let content_length = body.len();
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length);

    if status == StatusCode::OK {
        builder = builder
            .header("Accept-Ranges", "bytes")
            .header("Cache-Control", cache_control);
    } else {
        builder = builder.header("Cache-Control", "no-store");
    }
    if let Some(etag) = etag {
        builder = builder.header("ETag", etag);
    }

    let body = if is_head { Bytes::new() } else { body };
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status, &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 206 Partial Content response
#[allow(clippy::too_many_arguments)]
pub fn build_partial_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    cache_control: &str,
    start: usize,
    end: usize,
    total: usize,
    is_head: bool,
) -> ShellResponse {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Content-Range", format!("bytes {start}-{end}/{total}"))
        .header("Accept-Ranges", "bytes")
        .header("ETag", etag)
        .header("Cache-Control", cache_control)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::PARTIAL_CONTENT, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a text response (log viewer)
pub fn build_text_response(status: StatusCode, text: String) -> ShellResponse {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(text)))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a raw byte response (document content)
pub fn build_bytes_response(content_type: &str, data: Bytes) -> ShellResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", data.len())
        .header("Cache-Control", "no-store")
        .body(Full::new(data))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> ShellResponse {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response");
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from_static(
                    br#"{"error":"Internal server error"}"#,
                )))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// JSON error body `{"error": message}`
pub fn json_error(status: StatusCode, message: &str) -> ShellResponse {
    json_response(status, &serde_json::json!({ "error": message }))
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    tracing::error!(status = status.as_u16(), error = %error, "Failed to build response");
}
