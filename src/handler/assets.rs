//! Bundle asset serving
//!
//! Resolution and reads happen on the blocking pool; the handler turns the
//! routed response into HTTP with `ETag`, conditional and range support.

use std::sync::Arc;

use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::StatusCode;

use crate::config::AppState;
use crate::http::range::{self, RangeOutcome};
use crate::http::response::{
    build_304_response, build_416_response, build_asset_response, build_partial_response,
    build_text_response, content_type_header, ShellResponse,
};
use crate::http::cache;
use crate::routing::{AssetRouter, RouteRequest};

/// Request details asset serving depends on
#[derive(Debug, Clone, Default)]
pub struct AssetRequest {
    pub target: RouteRequest,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub range: Option<String>,
}

/// A routed asset read into memory
#[derive(Debug)]
pub enum Loaded {
    /// Host is not the virtual domain
    PassThrough,
    Asset {
        status: StatusCode,
        content_type: String,
        body: Bytes,
    },
    /// The store opened the asset but reading it failed
    ReadFailed(String),
}

/// Resolve and drain one asset; blocking
pub fn load(router: &AssetRouter, target: &RouteRequest) -> Loaded {
    let Some(routed) = router.resolve(target).into_response() else {
        return Loaded::PassThrough;
    };
    let status = routed.status_code();
    let content_type = content_type_header(routed.mime_type, routed.encoding);
    let asset_path = routed.asset_path;

    match routed.body.into_bytes() {
        Ok(body) => Loaded::Asset {
            status,
            content_type,
            body,
        },
        Err(e) => {
            tracing::error!(asset_path = %asset_path, error = %e, "Failed to read asset");
            Loaded::ReadFailed(asset_path)
        }
    }
}

/// Serve a GET or HEAD for the virtual domain
pub async fn serve(state: &Arc<AppState>, request: AssetRequest) -> ShellResponse {
    let router = Arc::clone(&state.router);
    let target = request.target.clone();
    let loaded = match tokio::task::spawn_blocking(move || load(&router, &target)).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "Asset task failed");
            return build_text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "500 Internal Server Error".to_string(),
            );
        }
    };

    let mut response = respond(state, &request, loaded);
    if state.config.http.enable_cors {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
    response
}

fn respond(state: &AppState, request: &AssetRequest, loaded: Loaded) -> ShellResponse {
    let cache_control = state.config.http.cache_control.as_str();
    match loaded {
        Loaded::PassThrough => build_text_response(
            StatusCode::MISDIRECTED_REQUEST,
            "421 Misdirected Request".to_string(),
        ),
        Loaded::ReadFailed(asset_path) => build_text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("500 Internal Server Error\n{asset_path}"),
        ),
        Loaded::Asset {
            status,
            content_type,
            body,
        } if status != StatusCode::OK => build_asset_response(
            status,
            &content_type,
            None,
            cache_control,
            body,
            request.is_head,
        ),
        Loaded::Asset {
            content_type, body, ..
        } => {
            let etag = cache::generate_etag(&body);
            if cache::etag_matches(request.if_none_match.as_deref(), &etag) {
                return build_304_response(&etag);
            }

            let total = body.len();
            match range::evaluate(request.range.as_deref(), total) {
                RangeOutcome::Partial(r) => {
                    let (start, end) = (*r.start(), *r.end());
                    build_partial_response(
                        body.slice(r),
                        &content_type,
                        &etag,
                        cache_control,
                        start,
                        end,
                        total,
                        request.is_head,
                    )
                }
                RangeOutcome::NotSatisfiable => build_416_response(total),
                RangeOutcome::Full => build_asset_response(
                    StatusCode::OK,
                    &content_type,
                    Some(&etag),
                    cache_control,
                    body,
                    request.is_head,
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use crate::config::Config;
    use crate::logger::LogBuffer;
    use http_body_util::BodyExt;

    fn state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::defaults().unwrap();
        config.documents.root = dir.path().join("docs").to_string_lossy().into_owned();
        let store = MemoryAssetStore::new()
            .with("dist/index.html", "<h1>home</h1>")
            .with("dist/app.js", "console.log(1)")
            .with("dist/video.mp4", vec![7u8; 100]);
        let state =
            AppState::with_store(config, Arc::new(store), LogBuffer::new(16, false)).unwrap();
        (dir, Arc::new(state))
    }

    fn get(path: &str) -> AssetRequest {
        AssetRequest {
            target: RouteRequest::new(Some("mypage.test"), Some(path)),
            ..AssetRequest::default()
        }
    }

    async fn body(resp: ShellResponse) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_serves_asset_with_type_and_etag() {
        let (_dir, state) = state();
        let resp = serve(&state, get("/app.js")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-type"],
            "application/javascript; charset=utf-8"
        );
        assert!(resp.headers().contains_key("etag"));
        assert_eq!(&body(resp).await[..], b"console.log(1)");
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let (_dir, state) = state();
        let resp = serve(&state, get("/")).await;
        assert_eq!(&body(resp).await[..], b"<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_missing_asset_is_404_page() {
        let (_dir, state) = state();
        let resp = serve(&state, get("/missing.png")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().get("etag").is_none());
        let page = body(resp).await;
        assert!(String::from_utf8_lossy(&page).contains("dist/missing.png"));
    }

    #[tokio::test]
    async fn test_conditional_get() {
        let (_dir, state) = state();
        let first = serve(&state, get("/app.js")).await;
        let etag = first.headers()["etag"].to_str().unwrap().to_string();

        let mut again = get("/app.js");
        again.if_none_match = Some(etag);
        let resp = serve(&state, again).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_range_requests() {
        let (_dir, state) = state();
        let mut partial = get("/video.mp4");
        partial.range = Some("bytes=10-19".into());
        let resp = serve(&state, partial).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["content-range"], "bytes 10-19/100");
        assert_eq!(body(resp).await.len(), 10);

        let mut beyond = get("/video.mp4");
        beyond.range = Some("bytes=500-".into());
        let resp = serve(&state, beyond).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let (_dir, state) = state();
        let mut head = get("/app.js");
        head.is_head = true;
        let resp = serve(&state, head).await;
        assert_eq!(resp.headers()["content-length"], "14");
        assert!(body(resp).await.is_empty());
    }

    #[test]
    fn test_load_other_host_passes_through() {
        let (_dir, state) = state();
        let target = RouteRequest::new(Some("other.example"), Some("/app.js"));
        assert!(matches!(load(&state.router, &target), Loaded::PassThrough));
    }
}
