//! Outbound request construction.
//!
//! # Responsibilities
//! - Build the target URL from base URL, path, and query
//! - Copy inbound headers, dropping `Host`
//! - Buffer the inbound body when one is declared
//!
//! # Design Decisions
//! - Path and query are appended verbatim (no re-encoding, no rewriting)
//! - The outbound client supplies its own `Host` from the target URL
//! - Body bytes pass through unmodified

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Uri};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::error::GatewayError;

/// Concatenate `base_url`, the request path, and the query string.
pub fn build_target_url(base_url: &str, uri: &Uri) -> String {
    let path = uri.path();
    let mut target = String::with_capacity(base_url.len() + path.len() + 16);
    target.push_str(base_url);
    target.push_str(path);

    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Every inbound header except `Host`, all values preserved.
pub fn copy_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(header::HOST);
    headers
}

/// Whether the inbound request declares a body.
pub fn has_declared_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Read the inbound body if one is declared, up to `limit` bytes.
pub async fn read_inbound_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    if !has_declared_body(headers) {
        return Ok(Bytes::new());
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(GatewayError::InvalidRequest(
            format!("request body exceeds {} bytes", limit),
        )),
        Err(e) => Err(GatewayError::InvalidRequest(format!("failed to read request body: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_target_url_with_query() {
        let uri: Uri = "/orders/42?x=1".parse().unwrap();
        assert_eq!(build_target_url("http://orders:8080", &uri), "http://orders:8080/orders/42?x=1");
    }

    #[test]
    fn test_target_url_without_query() {
        let uri: Uri = "/orders/42".parse().unwrap();
        assert_eq!(build_target_url("http://orders:8080", &uri), "http://orders:8080/orders/42");

        let uri: Uri = "/orders/42?".parse().unwrap();
        assert_eq!(build_target_url("http://orders:8080", &uri), "http://orders:8080/orders/42");
    }

    #[test]
    fn test_target_url_is_verbatim() {
        let uri: Uri = "/files/a%20b/../c?q=%2F&x=a+b".parse().unwrap();
        assert_eq!(
            build_target_url("http://files:1", &uri),
            "http://files:1/files/a%20b/../c?q=%2F&x=a+b"
        );
    }

    #[test]
    fn test_host_header_dropped() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("gateway.local"));
        inbound.insert("x-custom", HeaderValue::from_static("Value With Case"));
        inbound.append(header::ACCEPT, HeaderValue::from_static("text/html"));
        inbound.append(header::ACCEPT, HeaderValue::from_static("application/json"));

        let outbound = copy_request_headers(&inbound);
        assert!(outbound.get(header::HOST).is_none());
        assert_eq!(outbound.get("x-custom").unwrap(), "Value With Case");
        let accept: Vec<_> = outbound.get_all(header::ACCEPT).iter().collect();
        assert_eq!(accept, vec!["text/html", "application/json"]);
    }

    #[test]
    fn test_declared_body_detection() {
        let mut headers = HeaderMap::new();
        assert!(!has_declared_body(&headers));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        assert!(!has_declared_body(&headers));

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert!(has_declared_body(&headers));

        let mut chunked = HeaderMap::new();
        chunked.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        assert!(has_declared_body(&chunked));
    }

    #[tokio::test]
    async fn test_undeclared_body_is_not_read() {
        let body = read_inbound_body(&HeaderMap::new(), Body::from("ignored"), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_declared_body_passes_through() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("5"));
        let body = read_inbound_body(&headers, Body::from(vec![0xff, 0x00, b'a', 0xfe, b'\n']), 1024)
            .await
            .unwrap();
        assert_eq!(&body[..], &[0xff, 0x00, b'a', 0xfe, b'\n']);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("10"));
        let err = read_inbound_body(&headers, Body::from("0123456789"), 4).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(msg) if msg.contains("exceeds")));
    }
}
