//! Request identity and trusted-header extraction.
//!
//! # Responsibilities
//! - Generate unique request ids (UUID v4) at the edge
//! - Resolve the client IP from the trusted forwarded-for header
//! - Resolve the original scheme from the trusted forwarded-proto header
//!
//! The forwarded headers are supplied by the terminating edge layer and are
//! trusted by configuration; header names are configurable because they
//! vary per edge provider.

use std::net::{IpAddr, SocketAddr};

use axum::http::header::{HeaderMap, HeaderValue};
use axum::http::Request;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request id end to end.
pub const X_REQUEST_ID: &str = "x-request-id";

/// UUID v4 request id source for `SetRequestIdLayer`.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Resolve the client IP.
///
/// Takes the first element of the trusted forwarded-for header, falling
/// back to the peer address when the header is absent or unparseable.
pub fn client_ip(headers: &HeaderMap, forwarded_header: &str, peer: SocketAddr) -> IpAddr {
    headers
        .get(forwarded_header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| peer.ip())
}

/// Resolve the original request scheme.
///
/// Only an explicit `http` marks the request insecure; an absent or
/// unrecognized header means the terminating layer already spoke TLS.
pub fn forwarded_scheme(headers: &HeaderMap, forwarded_header: &str) -> &'static str {
    match headers
        .get(forwarded_header)
        .and_then(|value| value.to_str().ok())
    {
        Some(value) if value.trim().eq_ignore_ascii_case("http") => "http",
        _ => "https",
    }
}
