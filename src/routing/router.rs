//! Virtual-domain asset router
//!
//! Decides whether a request targets the virtual domain and, if so, maps it
//! onto the bundle. The router is total: every call yields a `RouteResult`,
//! missing or unreadable assets become HTML diagnostics rather than errors.

use super::RouteRequest;
use crate::assets::{AssetError, AssetStore, AssetStream};
use crate::http::mime;
use crate::http::response::escape_html;
use hyper::StatusCode;
use std::sync::Arc;

/// Path served for `/`, empty, or absent request paths
pub const INDEX_PATH: &str = "/index.html";

/// Character encoding reported for every routed response
pub const ENCODING: &str = "UTF-8";

/// A routed response ready to be written back to the requester
#[derive(Debug)]
pub struct AssetResponse {
    /// Bundle key the request resolved to
    pub asset_path: String,
    pub mime_type: &'static str,
    pub encoding: &'static str,
    /// `None` means success
    pub status: Option<StatusCode>,
    pub reason: Option<&'static str>,
    pub body: AssetStream,
}

impl AssetResponse {
    fn found(asset_path: String, body: AssetStream) -> Self {
        Self {
            mime_type: mime::mime_for_path(&asset_path),
            asset_path,
            encoding: ENCODING,
            status: None,
            reason: None,
            body,
        }
    }

    fn diagnostic(asset_path: String, status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or("Error");
        let page = diagnostic_page(status, reason, &asset_path);
        Self {
            asset_path,
            mime_type: "text/html",
            encoding: ENCODING,
            status: Some(status),
            reason: Some(reason),
            body: AssetStream::from_bytes(page),
        }
    }

    /// Effective HTTP status, success when none was set
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }
}

/// Tri-state outcome of asset resolution, plus read failures
#[derive(Debug)]
pub enum RouteResult {
    /// Host is not the virtual domain; caller handles the request normally
    PassThrough,
    Found(AssetResponse),
    NotFound(AssetResponse),
    /// The asset exists but could not be read
    Failed(AssetResponse),
}

impl RouteResult {
    pub const fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough)
    }

    /// Short name of the result class
    pub const fn class(&self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::Found(_) => "found",
            Self::NotFound(_) => "not_found",
            Self::Failed(_) => "failed",
        }
    }

    pub fn response(&self) -> Option<&AssetResponse> {
        match self {
            Self::PassThrough => None,
            Self::Found(r) | Self::NotFound(r) | Self::Failed(r) => Some(r),
        }
    }

    pub fn into_response(self) -> Option<AssetResponse> {
        match self {
            Self::PassThrough => None,
            Self::Found(r) | Self::NotFound(r) | Self::Failed(r) => Some(r),
        }
    }
}

/// Maps virtual-domain URLs onto a read-only asset store
#[derive(Clone)]
pub struct AssetRouter {
    virtual_domain: String,
    asset_base: String,
    store: Arc<dyn AssetStore>,
}

impl std::fmt::Debug for AssetRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRouter")
            .field("virtual_domain", &self.virtual_domain)
            .field("asset_base", &self.asset_base)
            .finish_non_exhaustive()
    }
}

impl AssetRouter {
    pub fn new(
        virtual_domain: impl Into<String>,
        asset_base: impl Into<String>,
        store: Arc<dyn AssetStore>,
    ) -> Self {
        let asset_base: String = asset_base.into();
        Self {
            virtual_domain: virtual_domain.into(),
            asset_base: asset_base.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn virtual_domain(&self) -> &str {
        &self.virtual_domain
    }

    pub fn asset_base(&self) -> &str {
        &self.asset_base
    }

    /// Case-sensitive host comparison against the virtual domain
    pub fn matches(&self, host: Option<&str>) -> bool {
        host == Some(self.virtual_domain.as_str())
    }

    /// Bundle key for a request path
    pub fn asset_path_for(&self, path: Option<&str>) -> String {
        let path = match path {
            None | Some("" | "/") => INDEX_PATH,
            Some(p) => p,
        };
        let path = path.strip_prefix('/').unwrap_or(path);
        if self.asset_base.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.asset_base, path)
        }
    }

    /// Resolve one request against the bundle
    ///
    /// Every call is logged at INFO, pass-through included, so detailed mode
    /// shows each request the shell saw.
    pub fn resolve(&self, request: &RouteRequest) -> RouteResult {
        tracing::info!("Intercepting URL: {request}");
        if !self.matches(request.host()) {
            return RouteResult::PassThrough;
        }

        let asset_path = self.asset_path_for(request.path());
        tracing::debug!(asset_path = %asset_path, "Resolved bundle asset");

        match self.store.open(&asset_path) {
            Ok(stream) => RouteResult::Found(AssetResponse::found(asset_path, stream)),
            Err(e @ (AssetError::NotFound(_) | AssetError::OutsideBundle(_))) => {
                tracing::warn!(asset_path = %asset_path, error = %e, "Asset not found");
                RouteResult::NotFound(AssetResponse::diagnostic(
                    asset_path,
                    StatusCode::NOT_FOUND,
                ))
            }
            Err(e) => {
                tracing::error!(asset_path = %asset_path, error = %e, "Failed to open asset");
                RouteResult::Failed(AssetResponse::diagnostic(
                    asset_path,
                    StatusCode::INTERNAL_SERVER_ERROR,
                ))
            }
        }
    }
}

fn diagnostic_page(status: StatusCode, reason: &str, asset_path: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{code} {reason}</title></head>\
<body><h2 style=\"color:red;\">{code} {reason}</h2><p>{path}</p></body></html>",
        code = status.as_u16(),
        path = escape_html(asset_path),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssetStore;
    use std::io;

    fn router() -> AssetRouter {
        let store = MemoryAssetStore::new()
            .with("dist/index.html", "<h1>home</h1>")
            .with("dist/app.js", "console.log('app')")
            .with("dist/img/Logo.PNG", vec![1_u8, 2, 3]);
        AssetRouter::new("mypage.test", "dist", Arc::new(store))
    }

    fn body_string(resp: AssetResponse) -> String {
        String::from_utf8(resp.body.into_bytes().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn test_foreign_host_passes_through() {
        let r = router();
        for url in [
            "https://other.example/app.js",
            "https://other.example/",
            "http://MYPAGE.TEST/app.js",
            "https://mypage.test.evil/app.js",
        ] {
            let req = RouteRequest::parse(url).unwrap();
            assert!(r.resolve(&req).is_pass_through(), "{url}");
        }
        assert!(r.resolve(&RouteRequest::new(None, Some("/app.js"))).is_pass_through());
    }

    #[test]
    fn test_index_fallback() {
        let r = router();
        assert_eq!(r.asset_path_for(None), "dist/index.html");
        assert_eq!(r.asset_path_for(Some("")), "dist/index.html");
        assert_eq!(r.asset_path_for(Some("/")), "dist/index.html");

        let result = r.resolve(&RouteRequest::new(Some("mypage.test"), None));
        let RouteResult::Found(resp) = result else {
            panic!("expected index to be found");
        };
        assert_eq!(resp.mime_type, "text/html");
        assert_eq!(body_string(resp), "<h1>home</h1>");
    }

    #[test]
    fn test_single_leading_slash_stripped() {
        let r = router();
        assert_eq!(r.asset_path_for(Some("/app.js")), "dist/app.js");
        assert_eq!(r.asset_path_for(Some("//app.js")), "dist//app.js");
        assert_eq!(r.asset_path_for(Some("app.js")), "dist/app.js");
    }

    #[test]
    fn test_empty_base_has_no_separator() {
        let r = AssetRouter::new("mypage.test", "", Arc::new(MemoryAssetStore::new()));
        assert_eq!(r.asset_path_for(Some("/app.js")), "app.js");
        assert_eq!(r.asset_path_for(None), "index.html");
    }

    #[test]
    fn test_trailing_slash_in_base_is_trimmed() {
        let r = AssetRouter::new("mypage.test", "dist/", Arc::new(MemoryAssetStore::new()));
        assert_eq!(r.asset_path_for(Some("/app.js")), "dist/app.js");
    }

    #[test]
    fn test_found_script() {
        let req = RouteRequest::parse("https://mypage.test/app.js").unwrap();
        let RouteResult::Found(resp) = router().resolve(&req) else {
            panic!("expected app.js to be found");
        };
        assert_eq!(resp.asset_path, "dist/app.js");
        assert_eq!(resp.mime_type, "application/javascript");
        assert_eq!(resp.encoding, "UTF-8");
        assert_eq!(resp.status, None);
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(body_string(resp), "console.log('app')");
    }

    #[test]
    fn test_mixed_case_extension_resolves() {
        let req = RouteRequest::parse("https://mypage.test/img/Logo.PNG").unwrap();
        let RouteResult::Found(resp) = router().resolve(&req) else {
            panic!("expected logo to be found");
        };
        assert_eq!(resp.mime_type, "image/png");
    }

    #[test]
    fn test_missing_asset_is_404() {
        let req = RouteRequest::parse("https://mypage.test/missing.png").unwrap();
        let RouteResult::NotFound(resp) = router().resolve(&req) else {
            panic!("expected 404");
        };
        assert_eq!(resp.status, Some(StatusCode::NOT_FOUND));
        assert_eq!(resp.reason, Some("Not Found"));
        assert_eq!(resp.mime_type, "text/html");
        assert_eq!(resp.encoding, "UTF-8");
        assert!(body_string(resp).contains("dist/missing.png"));
    }

    #[test]
    fn test_404_escapes_echoed_path() {
        let req = RouteRequest::new(Some("mypage.test"), Some("/<script>alert(1)</script>"));
        let RouteResult::NotFound(resp) = router().resolve(&req) else {
            panic!("expected 404");
        };
        let body = body_string(resp);
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_traversal_is_404() {
        let req = RouteRequest::new(Some("mypage.test"), Some("/../secret.txt"));
        assert_eq!(router().resolve(&req).class(), "not_found");
    }

    #[test]
    fn test_idempotent() {
        let r = router();
        for url in ["https://mypage.test/app.js", "https://mypage.test/nope.css"] {
            let req = RouteRequest::parse(url).unwrap();
            let first = r.resolve(&req);
            let second = r.resolve(&req);
            assert_eq!(first.class(), second.class());
            assert_eq!(
                first.response().map(|r| r.mime_type),
                second.response().map(|r| r.mime_type)
            );
        }
    }

    struct BrokenStore;

    impl AssetStore for BrokenStore {
        fn open(&self, path: &str) -> Result<AssetStream, AssetError> {
            Err(AssetError::Io {
                path: path.to_string(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        }

        fn exists(&self, _path: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_read_failure_is_500() {
        let r = AssetRouter::new("mypage.test", "dist", Arc::new(BrokenStore));
        let req = RouteRequest::parse("https://mypage.test/app.js").unwrap();
        let RouteResult::Failed(resp) = r.resolve(&req) else {
            panic!("expected failure");
        };
        assert_eq!(resp.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(resp.reason, Some("Internal Server Error"));
        assert!(body_string(resp).contains("dist/app.js"));
    }
}
