//! MIME type detection module
//!
//! Static extension table. Keys are lowercase and carry no leading dot.

/// Fallback for unmapped or missing extensions
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Get the MIME type for a file extension
///
/// Lookup is case-insensitive: the extension is lowercased first, so
/// `PNG` and `png` resolve the same way.
///
/// # Examples
/// ```
/// use assetshell::http::mime::mime_for;
/// assert_eq!(mime_for("html"), "text/html");
/// assert_eq!(mime_for("WOFF2"), "font/woff2");
/// assert_eq!(mime_for(""), "application/octet-stream");
/// ```
pub fn mime_for(extension: &str) -> &'static str {
    if extension.bytes().any(|b| b.is_ascii_uppercase()) {
        lookup(&extension.to_ascii_lowercase())
    } else {
        lookup(extension)
    }
}

fn lookup(extension: &str) -> &'static str {
    match extension {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",

        // JavaScript/WASM
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" => "video/quicktime",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",

        _ => DEFAULT_MIME,
    }
}

/// Extract the extension of the last segment of a `/`-separated path
///
/// Returns `None` when the segment has no dot or starts with one
/// (`.htaccess`), matching how hidden files carry no type.
pub fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&name[i + 1..]),
    }
}

/// MIME type for a path, via its extension
pub fn mime_for_path(path: &str) -> &'static str {
    extension_of(path).map_or(DEFAULT_MIME, mime_for)
}

/// Whether a MIME type is textual and should advertise a charset
pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/javascript"
                | "application/json"
                | "application/xml"
                | "application/manifest+json"
                | "image/svg+xml"
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_types() {
        assert_eq!(mime_for("html"), "text/html");
        assert_eq!(mime_for("css"), "text/css");
        assert_eq!(mime_for("js"), "application/javascript");
        assert_eq!(mime_for("json"), "application/json");
        assert_eq!(mime_for("png"), "image/png");
        assert_eq!(mime_for("jpg"), "image/jpeg");
        assert_eq!(mime_for("jpeg"), "image/jpeg");
        assert_eq!(mime_for("gif"), "image/gif");
        assert_eq!(mime_for("webp"), "image/webp");
        assert_eq!(mime_for("svg"), "image/svg+xml");
        assert_eq!(mime_for("ico"), "image/x-icon");
        assert_eq!(mime_for("wasm"), "application/wasm");
        assert_eq!(mime_for("woff"), "font/woff");
        assert_eq!(mime_for("woff2"), "font/woff2");
        assert_eq!(mime_for("ttf"), "font/ttf");
        assert_eq!(mime_for("otf"), "font/otf");
        assert_eq!(mime_for("mp3"), "audio/mpeg");
        assert_eq!(mime_for("mp4"), "video/mp4");
        assert_eq!(mime_for("wav"), "audio/wav");
        assert_eq!(mime_for("webm"), "video/webm");
        assert_eq!(mime_for("txt"), "text/plain");
        assert_eq!(mime_for("xml"), "application/xml");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(mime_for("unknownext"), DEFAULT_MIME);
        assert_eq!(mime_for(""), DEFAULT_MIME);
    }

    #[test]
    fn test_mixed_case_extension() {
        assert_eq!(mime_for("PNG"), "image/png");
        assert_eq!(mime_for("Js"), "application/javascript");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("dist/app.js"), Some("js"));
        assert_eq!(extension_of("dist/archive.tar.gz"), Some("gz"));
        assert_eq!(extension_of("dist/README"), None);
        assert_eq!(extension_of("dist/.htaccess"), None);
        assert_eq!(extension_of("v1.2/LICENSE"), None);
        assert_eq!(extension_of("index.html"), Some("html"));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path("dist/Photo.JPG"), "image/jpeg");
        assert_eq!(mime_for_path("dist/noext"), DEFAULT_MIME);
        assert_eq!(mime_for_path("dist/trailing."), DEFAULT_MIME);
    }

    #[test]
    fn test_is_text() {
        assert!(is_text("text/html"));
        assert!(is_text("application/javascript"));
        assert!(!is_text("image/png"));
        assert!(!is_text(DEFAULT_MIME));
    }
}
