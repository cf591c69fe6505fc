//! Rule predicates.
//!
//! # Responsibilities
//! - Match client IPs against the blocklist
//! - Detect requests that arrived over plain HTTP
//! - Match request paths against a prefix
//!
//! # Design Decisions
//! - Predicates see only the request context, never the raw request
//! - No regex; set membership and prefix checks keep matching O(1)/O(n)

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use crate::policy::RequestContext;

/// A condition a rule tests against the request context.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Returns true if the context matches this condition.
    fn matches(&self, ctx: &RequestContext<'_>) -> bool;
}

/// Matches client IPs contained in a fixed set.
#[derive(Debug, Clone)]
pub struct IpBlocklist {
    blocked: HashSet<IpAddr>,
}

impl IpBlocklist {
    pub fn new(blocked: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

impl Predicate for IpBlocklist {
    fn matches(&self, ctx: &RequestContext<'_>) -> bool {
        self.blocked.contains(&ctx.client_ip)
    }
}

/// Matches requests whose original scheme was plain HTTP.
#[derive(Debug, Clone, Copy)]
pub struct InsecureScheme;

impl Predicate for InsecureScheme {
    fn matches(&self, ctx: &RequestContext<'_>) -> bool {
        ctx.scheme == "http"
    }
}

/// Matches request paths under a fixed prefix.
#[derive(Debug, Clone)]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Predicate for PathPrefix {
    fn matches(&self, ctx: &RequestContext<'_>) -> bool {
        ctx.uri.path().starts_with(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    fn context<'a>(ip: &str, scheme: &'static str, uri: &'a Uri) -> RequestContext<'a> {
        RequestContext {
            client_ip: ip.parse().unwrap(),
            scheme,
            host: None,
            uri,
        }
    }

    #[test]
    fn blocklist_matches_members_only() {
        let uri: Uri = "/api/data".parse().unwrap();
        let blocklist = IpBlocklist::new(vec!["1.2.3.4".parse().unwrap()]);

        assert!(blocklist.matches(&context("1.2.3.4", "https", &uri)));
        assert!(!blocklist.matches(&context("9.9.9.9", "https", &uri)));
    }

    #[test]
    fn insecure_scheme_matches_plain_http() {
        let uri: Uri = "/".parse().unwrap();
        assert!(InsecureScheme.matches(&context("1.2.3.4", "http", &uri)));
        assert!(!InsecureScheme.matches(&context("1.2.3.4", "https", &uri)));
    }

    #[test]
    fn path_prefix_matches() {
        let uri: Uri = "/api/v1/users".parse().unwrap();
        let ctx = context("1.2.3.4", "https", &uri);
        assert!(PathPrefix::new("/api").matches(&ctx));
        assert!(!PathPrefix::new("/static").matches(&ctx));
    }
}
