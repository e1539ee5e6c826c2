//! Response relay and transparent gzip unwrap.
//!
//! # Responsibilities
//! - Carry the backend's status, headers, and fully buffered body
//! - Decompress gzip bodies and strip `Content-Encoding`
//! - Fall back to the encoded bytes when decompression fails or the
//!   inflated body would exceed the relay limit
//!
//! # Design Decisions
//! - `Transfer-Encoding` is never relayed; the server re-frames the body
//! - A stale `Content-Length` is removed after decompression

use std::io::{self, Read};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use flate2::read::MultiGzDecoder;

use crate::error::GatewayError;

/// Fixed body returned for the `welcome` pseudo-service.
pub const WELCOME_MESSAGE: &str = "Welcome to the Service Gateway";

/// A response ready to hand back to the client.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundResponse {
    /// Wrap a buffered backend response for relay.
    pub fn from_upstream(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> Self {
        headers.remove(header::TRANSFER_ENCODING);
        Self { status, headers, body }
    }

    /// The local greeting for the `welcome` route.
    pub fn welcome() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        Self {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(WELCOME_MESSAGE.as_bytes()),
        }
    }

    /// Decompress a gzip body in place, inflating at most `limit` bytes.
    /// On failure the response is left exactly as received.
    pub fn decode_gzip(mut self, limit: usize) -> Self {
        if !is_gzip_encoded(&self.headers) || self.body.is_empty() {
            return self;
        }

        match decompress_gzip(&self.body, limit) {
            Ok(text) => {
                self.headers.remove(header::CONTENT_ENCODING);
                self.headers.remove(header::CONTENT_LENGTH);
                self.body = Bytes::from(text);
            }
            Err(e) => {
                let err = GatewayError::from(e);
                tracing::warn!(error = %err, "Relaying encoded body unchanged");
            }
        }
        self
    }
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// `Content-Encoding` mentions gzip (case-insensitive).
pub fn is_gzip_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("gzip"))
}

/// Inflate a complete gzip stream into UTF-8 text.
///
/// Output longer than `limit` bytes is an `InvalidData` error. Invalid
/// UTF-8 sequences are replaced rather than rejected.
pub fn decompress_gzip(compressed: &[u8], limit: usize) -> io::Result<String> {
    let mut decoder = MultiGzDecoder::new(compressed).take(limit as u64 + 1);
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(4).min(limit));
    decoder.read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed body exceeds {} bytes", limit),
        ));
    }
    Ok(match String::from_utf8(out) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
