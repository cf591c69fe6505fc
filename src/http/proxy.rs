//! Proxy core.
//!
//! Orchestrates one request end to end: policy check → proxied-prefix
//! check → backend selection → forwarding → response shaping → error
//! translation. Each request runs in its own task and isolates its own
//! failures; nothing here can take the serving loop down.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{request::Parts, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::time;

use crate::error::GatewayError;
use crate::http::request::{client_ip, forwarded_scheme, X_REQUEST_ID};
use crate::http::response::fallback_response;
use crate::http::server::AppState;
use crate::load_balancer::Backend;
use crate::observability::metrics;
use crate::policy::rules::Predicate;
use crate::policy::{Decision, RequestContext};

/// Largest request body the gateway will buffer for a potential replay.
const MAX_REPLAY_BODY_BYTES: usize = 1024 * 1024;

/// Main proxy handler.
pub async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let shared = state.shared.load_full();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request.headers().get(X_REQUEST_ID).cloned();

    let resolved_ip = client_ip(request.headers(), &shared.forwarded_for_header, peer);
    let scheme = forwarded_scheme(request.headers(), &shared.forwarded_proto_header);
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    let ctx = RequestContext {
        client_ip: resolved_ip,
        scheme,
        host,
        uri: request.uri(),
    };

    match shared.policy.evaluate(&ctx) {
        Decision::Deny { reason } => {
            tracing::warn!(client_ip = %resolved_ip, reason, path = %path, "request denied by policy");
            let err = GatewayError::PolicyDenied(reason.to_string());
            metrics::record_policy_denied();
            metrics::record_request(&method, err.status_code().as_u16(), "none", start);
            return error_response(&err);
        }
        Decision::Redirect { location } => {
            tracing::debug!(location = %location, "upgrading insecure request");
            metrics::record_request(&method, 301, "none", start);
            return redirect_response(&location);
        }
        Decision::Allow => {}
    }

    if !shared.proxied_prefix.matches(&ctx) {
        let response = fallback_response(&shared.fallback);
        metrics::record_request(&method, response.status().as_u16(), "fallback", start);
        return response;
    }

    let upstream_timeout = shared.upstream_timeout;
    let (parts, body) = request.into_parts();

    // Buffer the body only when a retry may need to replay it.
    let (first_body, replay) = if shared.retry_on_failure {
        match axum::body::to_bytes(body, MAX_REPLAY_BODY_BYTES).await {
            Ok(bytes) => (Body::from(bytes.clone()), Some(bytes)),
            Err(_) => {
                metrics::record_request(&method, 413, "none", start);
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        }
    } else {
        (body, None)
    };

    let backends = state.registry.snapshot();
    let first = match state.balancer.select(&backends, shared.fail_closed) {
        Ok(backend) => backend,
        Err(err) => {
            tracing::warn!(error = %err, path = %path, "no backend for request");
            metrics::record_request(&method, err.status_code().as_u16(), "none", start);
            return error_response(&err);
        }
    };

    match forward_to_backend(
        &state.client,
        &parts,
        first_body,
        &first,
        request_id.as_ref(),
        upstream_timeout,
    )
    .await
    {
        Ok(upstream) => {
            state.registry.mark_success(&first);
            metrics::record_request(&method, upstream.status().as_u16(), &first.id, start);
            into_client_response(upstream, shared.cache_header_for(&path))
        }
        Err(err) => {
            tracing::error!(backend = %first.id, error = %err, "upstream request failed");
            if err.counts_as_backend_failure() {
                state.registry.mark_failure(&first);
            }

            if let Some(bytes) = replay {
                let retry_backends = state.registry.snapshot();
                if let Ok(second) = state.balancer.select(&retry_backends, shared.fail_closed) {
                    // One bounded retry, and only against a different backend.
                    if second.id != first.id {
                        metrics::record_upstream_retry();
                        tracing::info!(from = %first.id, to = %second.id, "retrying against alternate backend");
                        return match forward_to_backend(
                            &state.client,
                            &parts,
                            Body::from(bytes),
                            &second,
                            request_id.as_ref(),
                            upstream_timeout,
                        )
                        .await
                        {
                            Ok(upstream) => {
                                state.registry.mark_success(&second);
                                metrics::record_request(
                                    &method,
                                    upstream.status().as_u16(),
                                    &second.id,
                                    start,
                                );
                                into_client_response(upstream, shared.cache_header_for(&path))
                            }
                            Err(retry_err) => {
                                tracing::error!(backend = %second.id, error = %retry_err, "retry failed");
                                if retry_err.counts_as_backend_failure() {
                                    state.registry.mark_failure(&second);
                                }
                                metrics::record_request(
                                    &method,
                                    retry_err.status_code().as_u16(),
                                    &second.id,
                                    start,
                                );
                                error_response(&retry_err)
                            }
                        };
                    }
                }
            }

            metrics::record_request(&method, err.status_code().as_u16(), &first.id, start);
            error_response(&err)
        }
    }
}

/// Forward one request to one backend, bounded by the upstream deadline.
async fn forward_to_backend(
    client: &Client<HttpConnector, Body>,
    parts: &Parts,
    body: Body,
    backend: &Backend,
    request_id: Option<&HeaderValue>,
    timeout: Duration,
) -> Result<hyper::Response<Incoming>, GatewayError> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = Uri::builder()
        .scheme(backend.scheme.clone())
        .authority(backend.authority.clone())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| GatewayError::UpstreamConnection(e.to_string()))?;

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            if name == header::HOST || is_hop_by_hop(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        if let Ok(host) = HeaderValue::from_str(backend.authority.as_str()) {
            headers.insert(header::HOST, host);
        }
        if let Some(id) = request_id {
            headers.insert(X_REQUEST_ID, id.clone());
        }
    }
    let request = builder
        .body(body)
        .map_err(|e| GatewayError::UpstreamConnection(e.to_string()))?;

    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(GatewayError::UpstreamConnection(e.to_string())),
        Err(_) => Err(GatewayError::UpstreamTimeout),
    }
}

/// Hand the upstream response to the client, streaming the body.
fn into_client_response(
    upstream: hyper::Response<Incoming>,
    cache_header: Option<HeaderValue>,
) -> Response {
    let (mut parts, body) = upstream.into_parts();
    if let Some(value) = cache_header {
        parts.headers.insert(header::CACHE_CONTROL, value);
    }
    Response::from_parts(parts, Body::new(body))
}

fn redirect_response(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => (StatusCode::BAD_REQUEST, "Invalid redirect target").into_response(),
    }
}

/// Client-visible error translation. Bodies are constants; details stay in
/// the logs.
fn error_response(err: &GatewayError) -> Response {
    let body = match err {
        GatewayError::PolicyDenied(_) => "Access Denied",
        _ => "Backend Unavailable",
    };
    (err.status_code(), body).into_response()
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}
