//! Response shaping.
//!
//! # Responsibilities
//! - Build the fallback response for non-proxied paths
//! - Decide which request paths earn a cache header
//!
//! # Design Decisions
//! - The fallback body is static configured content; it never embeds the
//!   client address or the chosen backend
//! - Security headers are stamped by middleware, not here, so they also
//!   cover redirects and error responses

use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::FallbackConfig;

/// Precompiled fallback response parts.
#[derive(Debug, Clone)]
pub struct FallbackState {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: String,
}

impl FallbackState {
    /// Build from configuration. No configured body means a plain 404.
    pub fn from_config(config: &FallbackConfig) -> Self {
        match &config.body {
            Some(body) => Self {
                status: StatusCode::OK,
                content_type: HeaderValue::from_str(&config.content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("text/html; charset=utf-8")),
                body: body.clone(),
            },
            None => Self {
                status: StatusCode::NOT_FOUND,
                content_type: HeaderValue::from_static("text/plain; charset=utf-8"),
                body: "Not Found".to_string(),
            },
        }
    }
}

/// Response for paths outside the proxied prefix.
pub fn fallback_response(fallback: &FallbackState) -> Response {
    (
        fallback.status,
        [(header::CONTENT_TYPE, fallback.content_type.clone())],
        fallback.body.clone(),
    )
        .into_response()
}

/// True when the path's extension is in the static-asset list.
pub fn is_static_asset(path: &str, extensions: &[String]) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    if ext.is_empty() || ext.contains('/') {
        return false;
    }
    extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Precompile the Cache-Control value for static assets.
pub fn cache_control_value(max_age_secs: u64) -> HeaderValue {
    HeaderValue::from_str(&format!("public, max-age={max_age_secs}"))
        .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=86400"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions() -> Vec<String> {
        vec!["jpg".into(), "png".into(), "css".into(), "js".into()]
    }

    #[test]
    fn static_asset_matching() {
        let exts = extensions();
        assert!(is_static_asset("/assets/app.js", &exts));
        assert!(is_static_asset("/img/logo.PNG", &exts));
        assert!(!is_static_asset("/api/data", &exts));
        assert!(!is_static_asset("/api/data.json", &exts));
        // A dot in a directory name is not an extension.
        assert!(!is_static_asset("/v1.2/data", &exts));
        assert!(!is_static_asset("/trailing.", &exts));
    }

    #[test]
    fn cache_control_embeds_max_age() {
        assert_eq!(
            cache_control_value(86_400).to_str().unwrap(),
            "public, max-age=86400"
        );
        assert_eq!(
            cache_control_value(60).to_str().unwrap(),
            "public, max-age=60"
        );
    }

    #[test]
    fn default_fallback_is_404() {
        let state = FallbackState::from_config(&FallbackConfig::default());
        assert_eq!(state.status, StatusCode::NOT_FOUND);
        assert_eq!(state.body, "Not Found");
    }

    #[test]
    fn configured_fallback_serves_static_body() {
        let config = FallbackConfig {
            body: Some("<h1>Gateway Active</h1>".to_string()),
            content_type: "text/html; charset=utf-8".to_string(),
        };
        let state = FallbackState::from_config(&config);
        assert_eq!(state.status, StatusCode::OK);
        assert_eq!(state.body, "<h1>Gateway Active</h1>");
    }
}
