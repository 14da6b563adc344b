use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use super::{internal_error, AppState};
use crate::source::safe_relative;

const INDEX_FILE: &str = "index.html";
const DEFAULT_MAX_AGE: &str = "public, max-age=86400";

/// Cache lifetime by file type: data changes hourly, code daily, images weekly.
pub(crate) fn cache_control_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).unwrap_or_default();
    match ext.as_str() {
        "json" => "public, max-age=3600",
        "css" | "js" => "public, max-age=86400",
        "jpg" | "jpeg" | "png" | "gif" | "ico" | "svg" => "public, max-age=604800",
        _ => DEFAULT_MAX_AGE,
    }
}

pub(crate) fn content_type_for(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let textual = mime.type_() == mime_guess::mime::TEXT
        || matches!(mime.subtype().as_str(), "json" | "javascript" | "xml");
    if textual { format!("{}; charset=utf-8", mime.essence_str()) } else { mime.essence_str().to_string() }
}

/// Weak validator from size and modification time.
pub(crate) fn etag_for(len: u64, modified: SystemTime) -> String {
    let millis = modified.duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
    format!("W/\"{:x}-{:x}\"", len, millis)
}

pub(crate) fn http_date(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn not_modified(headers: &HeaderMap, etag: &str, modified: SystemTime) -> bool {
    if let Some(inm) = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        return inm.split(',').map(str::trim).any(|t| t == "*" || t == etag);
    }
    let since = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok());
    match since {
        Some(since) => DateTime::<Utc>::from(modified).timestamp() <= since.timestamp(),
        None => false,
    }
}

pub(crate) async fn static_handler(State(state): State<AppState>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let root = &state.config.server.root;
    if method != Method::GET && method != Method::HEAD {
        return serve_index(root, StatusCode::NOT_FOUND).await;
    }
    let Some(rel) = safe_relative(uri.path()) else {
        return serve_index(root, StatusCode::NOT_FOUND).await;
    };
    let path = root.join(rel);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => serve_file(&path, meta, &headers, method == Method::HEAD).await,
        _ => serve_index(root, StatusCode::NOT_FOUND).await,
    }
}

async fn serve_file(path: &Path, meta: std::fs::Metadata, headers: &HeaderMap, head_only: bool) -> Response {
    let modified = meta.modified().unwrap_or(UNIX_EPOCH);
    let etag = etag_for(meta.len(), modified);

    let mut out = HeaderMap::new();
    out.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control_for(path)));
    if let Ok(v) = HeaderValue::from_str(&etag) { out.insert(ETAG, v); }
    if let Ok(v) = HeaderValue::from_str(&http_date(modified)) { out.insert(LAST_MODIFIED, v); }

    if not_modified(headers, &etag, modified) {
        return (StatusCode::NOT_MODIFIED, out).into_response();
    }

    if let Ok(v) = HeaderValue::from_str(&content_type_for(path)) { out.insert(CONTENT_TYPE, v); }
    if head_only {
        if let Ok(v) = HeaderValue::from_str(&meta.len().to_string()) { out.insert(CONTENT_LENGTH, v); }
        return (StatusCode::OK, out).into_response();
    }
    match tokio::fs::read(path).await {
        Ok(bytes) => (StatusCode::OK, out, Body::from(bytes)).into_response(),
        Err(e) => internal_error(format!("reading {}: {e}", path.display())),
    }
}

/// The single-page shell. Also the body of every 404.
pub(crate) async fn serve_index(root: &Path, status: StatusCode) -> Response {
    let path = root.join(INDEX_FILE);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            status,
            [(CONTENT_TYPE, "text/html; charset=utf-8"), (CACHE_CONTROL, "public, max-age=0")],
            Body::from(bytes),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "index unavailable: {e}");
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn cache_lifetimes_by_extension() {
        assert_eq!(cache_control_for(Path::new("json/videos.json")), "public, max-age=3600");
        assert_eq!(cache_control_for(Path::new("js/script.js")), "public, max-age=86400");
        assert_eq!(cache_control_for(Path::new("images/Normal.JPG")), "public, max-age=604800");
        assert_eq!(cache_control_for(Path::new("favicon.ico")), "public, max-age=604800");
        assert_eq!(cache_control_for(Path::new("robots.txt")), DEFAULT_MAX_AGE);
        assert_eq!(cache_control_for(&PathBuf::from("LICENSE")), DEFAULT_MAX_AGE);
    }

    #[test]
    fn content_types_carry_charset_for_text() {
        assert_eq!(content_type_for(Path::new("a.json")), "application/json; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a.png")), "image/png");
    }

    #[test]
    fn etag_changes_with_mtime() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let a = etag_for(10, t);
        assert!(a.starts_with("W/\""));
        assert_ne!(a, etag_for(10, t + Duration::from_secs(1)));
    }

    #[test]
    fn conditional_requests() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let etag = etag_for(10, t);
        let mut h = HeaderMap::new();
        assert!(!not_modified(&h, &etag, t));
        h.insert(IF_NONE_MATCH, HeaderValue::from_str(&etag).unwrap());
        assert!(not_modified(&h, &etag, t));

        let mut h = HeaderMap::new();
        h.insert(IF_MODIFIED_SINCE, HeaderValue::from_str(&http_date(t)).unwrap());
        assert!(not_modified(&h, &etag, t));
        assert!(!not_modified(&h, &etag, t + Duration::from_secs(5)));
    }

    #[test]
    fn http_date_format() {
        assert_eq!(http_date(UNIX_EPOCH + Duration::from_secs(784_111_777)), "Sun, 06 Nov 1994 08:49:37 GMT");
    }
}
