//! Shell API handlers
//!
//! JSON endpoints on the virtual domain for the log viewer, the picker broker
//! and document storage. Errors are `{"error": message}`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_TYPE, ORIGIN};
use hyper::{Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{read_body, BodyError, BoxError};
use crate::config::AppState;
use crate::documents::{DocumentStore, ROOT_ID};
use crate::error::{Result, ShellError};
use crate::http::mime;
use crate::http::response::{
    build_bytes_response, build_text_response, json_error, json_response, ShellResponse,
};
use crate::picker::ChooserParams;

/// Longest a host UI may long-poll `/picker/pending`
const MAX_PENDING_WAIT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct CompleteBody {
    #[serde(default)]
    uris: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CreateBody {
    mime_type: String,
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct RenameBody {
    display_name: String,
}

type Query = HashMap<String, String>;

fn parse_query(query: Option<&str>) -> Query {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

fn param<'a>(query: &'a Query, name: &str) -> std::result::Result<&'a str, ShellResponse> {
    query.get(name).map(String::as_str).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            &format!("missing query parameter '{name}'"),
        )
    })
}

/// A request body and whether it was declared as JSON
struct Payload {
    bytes: Bytes,
    json: bool,
}

impl Payload {
    fn parse<T: DeserializeOwned>(&self) -> std::result::Result<T, ShellResponse> {
        // Simple cross-site forms cannot send this type without a preflight
        if !self.json {
            return Err(json_error(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "expected Content-Type: application/json",
            ));
        }
        serde_json::from_slice(&self.bytes)
            .map_err(|e| json_error(StatusCode::BAD_REQUEST, &format!("invalid JSON body: {e}")))
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
}

/// Requests from pages outside the virtual domain are refused
///
/// A missing `Origin` is allowed: browsers omit it on same-origin GETs and
/// the native host UI does not send one.
fn check_origin(headers: &HeaderMap, virtual_domain: &str) -> std::result::Result<(), ShellResponse> {
    let cross_site = headers
        .get("sec-fetch-site")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|site| site.eq_ignore_ascii_case("cross-site"));

    let foreign_origin = headers.get(ORIGIN).is_some_and(|origin| {
        let parsed = origin.to_str().ok().and_then(|o| url::Url::parse(o).ok());
        !parsed.is_some_and(|url| {
            matches!(url.scheme(), "http" | "https") && url.host_str() == Some(virtual_domain)
        })
    });

    if cross_site || foreign_origin {
        tracing::warn!(origin = ?headers.get(ORIGIN), "Cross-origin shell API request refused");
        return Err(json_error(StatusCode::FORBIDDEN, "cross-origin request refused"));
    }
    Ok(())
}

/// HTTP status for an application error
pub fn status_for(error: &ShellError) -> StatusCode {
    match error {
        ShellError::DocumentNotFound(_) | ShellError::UnknownPick(_) => StatusCode::NOT_FOUND,
        ShellError::DocumentExists(_) => StatusCode::CONFLICT,
        ShellError::InvalidDocument(_) | ShellError::InvalidOpenMode(_) | ShellError::Json(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &ShellError) -> ShellResponse {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::error!(error = %error, "Shell API request failed");
    } else {
        tracing::debug!(error = %error, status = status.as_u16(), "Shell API request rejected");
    }
    json_error(status, &error.to_string())
}

fn method_not_allowed() -> ShellResponse {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

/// Handle a request whose path starts with the API prefix
///
/// `route` is the remainder of the path after the prefix, e.g. `/logs`.
pub async fn handle<B>(req: Request<B>, state: &Arc<AppState>, route: &str) -> ShellResponse
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    if let Err(refused) = check_origin(&parts.headers, &state.config.shell.virtual_domain) {
        return refused;
    }
    let query = parse_query(parts.uri.query());
    let body = match read_body(body, state.config.http.max_body_size).await {
        Ok(bytes) => Payload {
            bytes,
            json: is_json(&parts.headers),
        },
        Err(BodyError::TooLarge) => {
            return json_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
        }
        Err(BodyError::Read(e)) => {
            return json_error(StatusCode::BAD_REQUEST, &format!("failed to read body: {e}"))
        }
    };

    let route = route.trim_end_matches('/');
    let response = match route {
        "/logs" => logs(&parts.method, &query, state),
        "/logs/detailed" => detailed(&parts.method, &body.bytes, state),
        "/picker" => picker_request(&parts.method, &body, state).await,
        "/picker/pending" => picker_pending(&parts.method, &query, state).await,
        "/picker/complete" => picker_complete(&parts.method, &query, &body, state).await,
        r if r.starts_with("/documents/") => {
            documents(&parts.method, &r["/documents".len()..], &query, body, state).await
        }
        _ => Err(json_error(StatusCode::NOT_FOUND, "unknown shell API endpoint")),
    };

    let response = response.unwrap_or_else(|err| err);
    tracing::debug!(
        method = %parts.method,
        route,
        status = response.status().as_u16(),
        "Shell API request"
    );
    response
}

type ApiResult = std::result::Result<ShellResponse, ShellResponse>;

fn logs(method: &Method, query: &Query, state: &AppState) -> ApiResult {
    match *method {
        Method::GET => {
            if query.get("format").map(String::as_str) == Some("json") {
                Ok(json_response(StatusCode::OK, &state.log_buffer.to_json()))
            } else {
                Ok(build_text_response(
                    StatusCode::OK,
                    state.log_buffer.render_text(),
                ))
            }
        }
        Method::DELETE => {
            state.log_buffer.clear();
            Ok(json_response(StatusCode::OK, &json!({ "cleared": true })))
        }
        _ => Err(method_not_allowed()),
    }
}

fn detailed(method: &Method, body: &Bytes, state: &AppState) -> ApiResult {
    if *method != Method::PUT {
        return Err(method_not_allowed());
    }
    let text = String::from_utf8_lossy(body).trim().to_ascii_lowercase();
    let on = match text.as_str() {
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        _ => {
            return Err(json_error(
                StatusCode::BAD_REQUEST,
                "expected 'on' or 'off'",
            ))
        }
    };
    state.log_buffer.set_detailed(on);
    Ok(json_response(StatusCode::OK, &json!({ "detailed": on })))
}

async fn picker_request(method: &Method, body: &Payload, state: &AppState) -> ApiResult {
    if *method != Method::POST {
        return Err(method_not_allowed());
    }
    let params: ChooserParams = body.parse()?;
    let ticket = state.picker.request(&params);
    let id = ticket.id();
    let limit = Duration::from_secs(state.config.picker.timeout_secs);

    let uris = match tokio::time::timeout(limit, ticket).await {
        Ok(uris) => uris,
        Err(_) => {
            tracing::warn!(id, "Picker request timed out");
            None
        }
    };
    Ok(json_response(StatusCode::OK, &json!({ "id": id, "uris": uris })))
}

async fn picker_pending(method: &Method, query: &Query, state: &AppState) -> ApiResult {
    if *method != Method::GET {
        return Err(method_not_allowed());
    }
    let wait = query
        .get("wait")
        .and_then(|w| w.parse::<u64>().ok())
        .unwrap_or(0)
        .min(MAX_PENDING_WAIT_SECS);

    if wait > 0 {
        state
            .host_queue
            .wait_until(Duration::from_secs(wait), || !state.picker.pending().is_empty())
            .await;
    }
    Ok(json_response(
        StatusCode::OK,
        &json!({ "pending": state.picker.pending() }),
    ))
}

async fn picker_complete(
    method: &Method,
    query: &Query,
    body: &Payload,
    state: &AppState,
) -> ApiResult {
    if *method != Method::POST {
        return Err(method_not_allowed());
    }
    let id = param(query, "id")?
        .parse::<u64>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "id must be an integer"))?;
    let outcome = if body.bytes.is_empty() {
        None
    } else {
        body.parse::<CompleteBody>()?.uris
    };

    // Directory picks list files and persist state on disk
    let picker = state.picker.clone();
    match tokio::task::spawn_blocking(move || picker.complete(id, outcome)).await {
        Ok(result) => result.map_err(|e| error_response(&e))?,
        Err(e) => {
            tracing::error!(error = %e, "Picker completion task failed");
            return Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "picker task failed"));
        }
    }
    Ok(json_response(StatusCode::OK, &json!({ "completed": id })))
}

/// Run a blocking document operation off the runtime
async fn with_documents<T, F>(store: &DocumentStore, op: F) -> std::result::Result<T, ShellResponse>
where
    T: Send + 'static,
    F: FnOnce(&DocumentStore) -> Result<T> + Send + 'static,
{
    let store = store.clone();
    match tokio::task::spawn_blocking(move || op(&store)).await {
        Ok(result) => result.map_err(|e| error_response(&e)),
        Err(e) => {
            tracing::error!(error = %e, "Document task failed");
            Err(json_error(StatusCode::INTERNAL_SERVER_ERROR, "document task failed"))
        }
    }
}

async fn documents(
    method: &Method,
    route: &str,
    query: &Query,
    body: Payload,
    state: &AppState,
) -> ApiResult {
    let Some(store) = state.documents.as_ref() else {
        return Err(json_error(StatusCode::NOT_FOUND, "document storage is disabled"));
    };

    match (method, route) {
        (&Method::GET, "/roots") => Ok(json_response(StatusCode::OK, &store.query_roots())),

        (&Method::GET, "/document") => {
            let id = param(query, "id")?.to_string();
            let row = with_documents(store, move |s| s.query_document(&id)).await?;
            Ok(json_response(StatusCode::OK, &row))
        }
        (&Method::DELETE, "/document") => {
            let id = param(query, "id")?.to_string();
            let deleted = id.clone();
            with_documents(store, move |s| s.delete(&id)).await?;
            Ok(json_response(StatusCode::OK, &json!({ "deleted": deleted })))
        }

        (&Method::GET, "/children") => {
            let id = query.get("id").cloned().unwrap_or_else(|| ROOT_ID.to_string());
            let rows = with_documents(store, move |s| s.query_children(&id)).await?;
            Ok(json_response(StatusCode::OK, &rows))
        }
        (&Method::POST, "/children") => {
            let parent = query.get("id").cloned().unwrap_or_else(|| ROOT_ID.to_string());
            let create: CreateBody = body.parse()?;
            let id = with_documents(store, move |s| {
                s.create(&parent, &create.mime_type, &create.display_name)
            })
            .await?;
            Ok(json_response(StatusCode::CREATED, &json!({ "document_id": id })))
        }

        (&Method::GET, "/content") => {
            let id = param(query, "id")?.to_string();
            let content_type = mime::mime_for_path(&id);
            let data = with_documents(store, move |s| s.read(&id)).await?;
            Ok(build_bytes_response(content_type, Bytes::from(data)))
        }
        (&Method::PUT, "/content") => {
            let id = param(query, "id")?.to_string();
            let bytes = body.bytes;
            let size = bytes.len();
            with_documents(store, move |s| s.write(&id, &bytes)).await?;
            Ok(json_response(StatusCode::OK, &json!({ "size": size })))
        }

        (&Method::POST, "/rename") => {
            let id = param(query, "id")?.to_string();
            let rename: RenameBody = body.parse()?;
            let new_id =
                with_documents(store, move |s| s.rename(&id, &rename.display_name)).await?;
            Ok(json_response(StatusCode::OK, &json!({ "document_id": new_id })))
        }

        (&Method::GET, "/is_child") => {
            let parent = param(query, "parent")?.to_string();
            let id = param(query, "id")?.to_string();
            let is_child = with_documents(store, move |s| Ok(s.is_child(&parent, &id))).await?;
            Ok(json_response(StatusCode::OK, &json!({ "is_child": is_child })))
        }

        (_, "/roots" | "/document" | "/children" | "/content" | "/rename" | "/is_child") => {
            Err(method_not_allowed())
        }
        _ => Err(json_error(StatusCode::NOT_FOUND, "unknown documents endpoint")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::config::Config;
    use crate::logger::LogBuffer;
    use http_body_util::{BodyExt, Full};

    fn state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::defaults().unwrap();
        config.documents.root = dir.path().join("docs").to_string_lossy().into_owned();
        config.picker.timeout_secs = 5;
        let state = AppState::with_store(
            config,
            Arc::new(MemoryAssetStore::new()),
            LogBuffer::new(32, false),
        )
        .unwrap();
        (dir, Arc::new(state))
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if method == Method::POST {
            builder = builder.header("content-type", "application/json");
        }
        builder.body(Full::new(Bytes::from(body.to_string()))).unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> StatusCode {
        let route = req.uri().path().to_string();
        handle(req, state, &route).await.status()
    }

    async fn call(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let req = request(method, uri, body);
        let route = req.uri().path().to_string();
        let resp = handle(req, state, &route).await;
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_logs_toggle_and_clear() {
        let (_dir, state) = state();
        state
            .log_buffer
            .record(tracing::Level::ERROR, "test", "boom");

        let (status, v) = call(&state, Method::GET, "/logs?format=json", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["entries"][0]["message"], "boom");

        let (_, v) = call(&state, Method::PUT, "/logs/detailed", "on").await;
        assert_eq!(v["detailed"], true);
        assert!(state.log_buffer.is_detailed());

        let (status, _) = call(&state, Method::PUT, "/logs/detailed", "maybe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        call(&state, Method::DELETE, "/logs", "").await;
        assert!(state.log_buffer.is_empty());

        let (status, _) = call(&state, Method::POST, "/logs", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_logs_text() {
        let (_dir, state) = state();
        state.log_buffer.record(tracing::Level::WARN, "test", "careful");
        let resp = handle(request(Method::GET, "/logs", ""), &state, "/logs").await;
        let text = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&text).contains("[WARN] careful"));
    }

    #[tokio::test]
    async fn test_picker_round_trip() {
        let (_dir, state) = state();

        let page = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                call(&state, Method::POST, "/picker", r#"{"mode": "open", "accept_types": ["image/*"]}"#)
                    .await
            })
        };

        let (_, pending) = call(&state, Method::GET, "/picker/pending?wait=5", "").await;
        let mut pending = pending;
        while pending["pending"].as_array().map_or(true, Vec::is_empty) {
            tokio::task::yield_now().await;
            pending = call(&state, Method::GET, "/picker/pending", "").await.1;
        }
        let id = pending["pending"][0]["id"].as_u64().unwrap();
        assert_eq!(pending["pending"][0]["request"]["kind"], "open");

        let (status, _) = call(
            &state,
            Method::POST,
            &format!("/picker/complete?id={id}"),
            r#"{"uris": ["content://media/1"]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, v) = page.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["uris"][0], "content://media/1");
    }

    #[tokio::test]
    async fn test_picker_complete_errors() {
        let (_dir, state) = state();
        let (status, _) = call(&state, Method::POST, "/picker/complete?id=99", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, Method::POST, "/picker/complete", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&state, Method::POST, "/picker", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_documents_flow() {
        let (_dir, state) = state();

        let (_, roots) = call(&state, Method::GET, "/documents/roots", "").await;
        assert_eq!(roots[0]["root_id"], "root");

        let (status, created) = call(
            &state,
            Method::POST,
            "/documents/children?id=root",
            r#"{"mime_type": "text/plain", "display_name": "a.txt"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["document_id"], "a.txt");

        let (status, _) = call(
            &state,
            Method::POST,
            "/documents/children?id=root",
            r#"{"mime_type": "text/plain", "display_name": "a.txt"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&state, Method::PUT, "/documents/content?id=a.txt", "hi").await;
        assert_eq!(status, StatusCode::OK);
        let resp = handle(
            request(Method::GET, "/documents/content?id=a.txt", ""),
            &state,
            "/documents/content",
        )
        .await;
        assert_eq!(resp.headers()["content-type"], "text/plain");
        assert_eq!(&resp.into_body().collect().await.unwrap().to_bytes()[..], b"hi");

        let (_, renamed) = call(
            &state,
            Method::POST,
            "/documents/rename?id=a.txt",
            r#"{"display_name": "b.txt"}"#,
        )
        .await;
        assert_eq!(renamed["document_id"], "b.txt");

        let (_, child) = call(&state, Method::GET, "/documents/is_child?parent=root&id=b.txt", "").await;
        assert_eq!(child["is_child"], true);

        let (_, rows) = call(&state, Method::GET, "/documents/children", "").await;
        assert_eq!(rows.as_array().unwrap().len(), 1);

        let (status, _) = call(&state, Method::DELETE, "/documents/document?id=b.txt", "").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&state, Method::GET, "/documents/document?id=b.txt", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, Method::GET, "/documents/document?id=../x", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cross_origin_writes_refused() {
        let (dir, state) = state();
        let create = r#"{"mime_type": "text/plain", "display_name": "planted.txt"}"#;
        let planted = dir.path().join("docs").join("planted.txt");

        let mut req = request(Method::POST, "/documents/children?id=root", create);
        req.headers_mut()
            .insert("origin", "http://evil.example".parse().unwrap());
        assert_eq!(send(&state, req).await, StatusCode::FORBIDDEN);

        let mut req = request(Method::POST, "/documents/children?id=root", create);
        req.headers_mut()
            .insert("origin", "null".parse().unwrap());
        assert_eq!(send(&state, req).await, StatusCode::FORBIDDEN);

        let mut req = request(Method::POST, "/documents/children?id=root", create);
        req.headers_mut()
            .insert("sec-fetch-site", "cross-site".parse().unwrap());
        assert_eq!(send(&state, req).await, StatusCode::FORBIDDEN);

        assert!(!planted.exists());

        let mut req = request(Method::POST, "/documents/children?id=root", create);
        req.headers_mut()
            .insert("origin", "http://mypage.test".parse().unwrap());
        assert_eq!(send(&state, req).await, StatusCode::CREATED);
        assert!(planted.exists());
    }

    #[tokio::test]
    async fn test_json_endpoints_require_json_content_type() {
        let (dir, state) = state();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/documents/children?id=root")
            .header("content-type", "text/plain")
            .body(Full::new(Bytes::from_static(
                br#"{"mime_type": "text/plain", "display_name": "a.txt"}"#,
            )))
            .unwrap();
        assert_eq!(send(&state, req).await, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(!dir.path().join("docs").join("a.txt").exists());

        let ticket = state.picker.request(&ChooserParams::default());
        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("/picker/complete?id={}", ticket.id()))
            .body(Full::new(Bytes::from_static(br#"{"uris": ["content://x"]}"#)))
            .unwrap();
        assert_eq!(send(&state, req).await, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(state.picker.pending().len(), 1);

        let req = Request::builder()
            .method(Method::POST)
            .uri(format!("/picker/complete?id={}", ticket.id()))
            .header("content-type", "Application/JSON; charset=utf-8")
            .body(Full::new(Bytes::from_static(br#"{"uris": ["content://x"]}"#)))
            .unwrap();
        assert_eq!(send(&state, req).await, StatusCode::OK);
        assert_eq!(ticket.await, Some(vec!["content://x".to_string()]));
    }

    #[tokio::test]
    async fn test_picker_complete_enumerates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        std::fs::create_dir(&music).unwrap();
        std::fs::write(music.join("song.mp3"), b"x").unwrap();
        let mut config = Config::defaults().unwrap();
        config.documents.enabled = false;
        config.picker.directory_mode = crate::picker::DirectoryMode::EnumerateFiles;
        config.picker.state_file = Some(
            dir.path().join("state").join("picker.toml").to_string_lossy().into_owned(),
        );
        let state = Arc::new(
            AppState::with_store(config, Arc::new(MemoryAssetStore::new()), LogBuffer::new(8, false))
                .unwrap(),
        );

        let ticket = state.picker.request(&ChooserParams {
            mode: crate::picker::ChooserMode::OpenFolder,
            ..ChooserParams::default()
        });
        let body = json!({ "uris": [music.to_string_lossy()] }).to_string();
        let (status, _) = call(
            &state,
            Method::POST,
            &format!("/picker/complete?id={}", ticket.id()),
            &body,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let files = ticket.await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("song.mp3"));
        assert!(dir.path().join("state").join("picker.toml").exists());
    }

    #[tokio::test]
    async fn test_pending_wait_returns_once_requested() {
        let (_dir, state) = state();
        let _ticket = state.picker.request(&ChooserParams::default());
        let started = std::time::Instant::now();
        let (_, v) = call(&state, Method::GET, "/picker/pending?wait=30", "").await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(v["pending"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let (_dir, state) = state();
        let (status, v) = call(&state, Method::GET, "/nope", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(v["error"].is_string());
    }
}
