use std::io::Write;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use flate2::{write::GzEncoder, Compression};

use super::{internal_error, AppState};

/// Clients can opt out per request with this header.
pub(crate) const NO_COMPRESSION_HEADER: &str = "x-no-compression";

pub(crate) fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|enc| enc.split(';').next().map(str::trim) == Some("gzip")))
        .unwrap_or(false)
}

pub(crate) fn is_compressible(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.starts_with("text/")
        || essence.ends_with("+json")
        || essence.ends_with("+xml")
        || matches!(essence, "application/json" | "application/javascript" | "application/xml" | "image/svg+xml")
}

pub(crate) fn gzip(bytes: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity((bytes.len() / 2).max(256)), Compression::new(level.min(9)));
    encoder.write_all(bytes)?;
    encoder.finish()
}

pub(crate) async fn compression_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let wanted = accepts_gzip(req.headers()) && !req.headers().contains_key(NO_COMPRESSION_HEADER);
    let resp = next.run(req).await;
    if !wanted || resp.status() == StatusCode::NOT_MODIFIED || resp.headers().contains_key(CONTENT_ENCODING) {
        return resp;
    }
    let compressible = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(is_compressible)
        .unwrap_or(false);
    if !compressible {
        return resp;
    }

    let (mut parts, body) = resp.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => return internal_error(format!("buffering response: {e}")),
    };
    if bytes.len() < state.config.server.compression_threshold {
        return Response::from_parts(parts, Body::from(bytes));
    }
    let compressed = match gzip(&bytes, state.config.server.compression_level) {
        Ok(c) => c,
        Err(e) => return internal_error(format!("gzip encoding failed: {e}")),
    };
    parts.headers.remove(CONTENT_LENGTH);
    parts.headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    parts.headers.append(VARY, HeaderValue::from_static("Accept-Encoding"));
    Response::from_parts(parts, Body::from(compressed))
}
