use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// Allows the Bootstrap CDN and YouTube embeds, nothing else off-origin.
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self';\
script-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net;\
style-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net;\
img-src 'self' data: https:;\
font-src 'self' https://cdn.jsdelivr.net;\
frame-src 'self' https://www.youtube.com;\
connect-src 'self';\
base-uri 'self';\
form-action 'self';\
frame-ancestors 'self';\
object-src 'none';\
script-src-attr 'none';\
upgrade-insecure-requests";

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

pub(crate) async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(*name), HeaderValue::from_static(*value));
    }
    headers.remove("x-powered-by");
    resp
}
